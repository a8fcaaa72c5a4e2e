use crate::abstract_trait::{DynProductQueryRepository, ProductQueryServiceTrait};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::FindAllRequest,
        responses::{ApiResponse, ApiResponsePagination, Pagination, ProductResponse},
    },
    errors::ServiceError,
    utils::{Method, OperationTracer},
};
use tracing::info;
use validator::Validate;

#[derive(Clone)]
pub struct ProductQueryService {
    query: DynProductQueryRepository,
    tracer: OperationTracer,
}

impl ProductQueryService {
    pub fn new(query: DynProductQueryRepository, registry: &mut Registry) -> Self {
        let tracer = OperationTracer::new("product-query-service");
        tracer.register(registry);

        Self { query, tracer }
    }
}

#[async_trait]
impl ProductQueryServiceTrait for ProductQueryService {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<ProductResponse>>, ServiceError> {
        req.validate()?;

        let tracing_ctx = self.tracer.start_tracing(
            "find_all_products",
            vec![
                KeyValue::new("component", "product"),
                KeyValue::new("page", req.page.to_string()),
                KeyValue::new("search", req.search.clone()),
            ],
        );

        let result = self.query.find_all(req).await.map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched products");
        let (products, total) = result?;

        info!("📋 Found {} of {total} products", products.len());

        let data = products.into_iter().map(ProductResponse::from).collect();

        Ok(ApiResponsePagination::success(
            "Products retrieved successfully",
            data,
            Pagination::new(req.page, req.page_size, total),
        ))
    }

    async fn find_by_id(&self, id: i32) -> Result<ApiResponse<ProductResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "find_product_by_id",
            vec![
                KeyValue::new("component", "product"),
                KeyValue::new("product.id", id.to_string()),
            ],
        );

        let result = match self.query.find_by_id(id).await {
            Ok(Some(product)) => Ok(product),
            Ok(None) => Err(ServiceError::not_found()),
            Err(e) => Err(ServiceError::from(e)),
        };

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched product");

        Ok(ApiResponse::success(
            "Product retrieved successfully",
            ProductResponse::from(result?),
        ))
    }
}
