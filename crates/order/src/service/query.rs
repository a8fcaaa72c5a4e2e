use crate::abstract_trait::{DynOrderQueryRepository, OrderQueryServiceTrait};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::FindAllRequest,
        responses::{ApiResponse, ApiResponsePagination, Pagination, OrderResponse},
    },
    errors::ServiceError,
    utils::{Method, OperationTracer},
};
use tracing::info;
use validator::Validate;

#[derive(Clone)]
pub struct OrderQueryService {
    query: DynOrderQueryRepository,
    tracer: OperationTracer,
}

impl OrderQueryService {
    pub fn new(query: DynOrderQueryRepository, registry: &mut Registry) -> Self {
        let tracer = OperationTracer::new("order-query-service");
        tracer.register(registry);

        Self { query, tracer }
    }
}

#[async_trait]
impl OrderQueryServiceTrait for OrderQueryService {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError> {
        req.validate()?;

        let tracing_ctx = self.tracer.start_tracing(
            "find_all_orders",
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("page", req.page.to_string()),
                KeyValue::new("search", req.search.clone()),
            ],
        );

        let result = self.query.find_all(req).await.map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched orders");
        let (orders, total) = result?;

        info!("📋 Found {} of {total} orders", orders.len());

        let data = orders.into_iter().map(OrderResponse::from).collect();

        Ok(ApiResponsePagination::success(
            "Orders retrieved successfully",
            data,
            Pagination::new(req.page, req.page_size, total),
        ))
    }

    async fn find_by_id(&self, id: i32) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "find_order_by_id",
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("order.id", id.to_string()),
            ],
        );

        let result = match self.query.find_by_id(id).await {
            Ok(Some(order)) => Ok(order),
            Ok(None) => Err(ServiceError::not_found()),
            Err(e) => Err(ServiceError::from(e)),
        };

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched order");

        Ok(ApiResponse::success(
            "Order retrieved successfully",
            OrderResponse::from(result?),
        ))
    }
}
