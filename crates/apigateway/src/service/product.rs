use crate::{
    abstract_trait::ProductGrpcClientTrait,
    cache::StaleCache,
    domain::{DeleteResponse, Fetched},
};
use async_trait::async_trait;
use genproto::{
    common::{FindAllRequest as FindAllRequestProto, FindByIdRequest},
    product::{
        ApiResponsePaginationProduct, ApiResponseProduct,
        CreateProductRequest as CreateProductRequestProto,
        UpdateProductRequest as UpdateProductRequestProto,
        product_command_service_client::ProductCommandServiceClient,
        product_query_service_client::ProductQueryServiceClient,
    },
};
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::{CreateProductRequest, FindAllRequest, UpdateProductRequest},
        responses::{ApiResponse, ApiResponsePagination, ProductResponse},
    },
    errors::{ServiceError, grpc_status_to_service_error},
    resilience::Resilience,
    utils::{Method, OperationTracer},
};
use std::sync::Arc;
use tonic::{Request, transport::Channel};

#[derive(Clone)]
pub struct ProductGrpcClientService {
    query_client: ProductQueryServiceClient<Channel>,
    command_client: ProductCommandServiceClient<Channel>,
    resilience: Resilience,
    /// Creates carry no idempotency key, so they are never retried.
    create_resilience: Resilience,
    tracer: OperationTracer,
    cache: Arc<StaleCache<ProductResponse>>,
}

impl ProductGrpcClientService {
    pub fn new(
        query_client: ProductQueryServiceClient<Channel>,
        command_client: ProductCommandServiceClient<Channel>,
        resilience: Resilience,
        cache_capacity: usize,
        registry: &mut Registry,
    ) -> Self {
        let tracer = OperationTracer::new("apigateway-product-client");
        tracer.register(registry);

        Self {
            query_client,
            command_client,
            create_resilience: resilience.without_retry(),
            resilience,
            tracer,
            cache: Arc::new(StaleCache::new("products", cache_capacity)),
        }
    }
}

fn product_reply(response: ApiResponseProduct) -> Result<ApiResponse<ProductResponse>, ServiceError> {
    let data = response
        .data
        .map(ProductResponse::from)
        .ok_or_else(|| ServiceError::Internal("product-service returned no product data".into()))?;

    Ok(ApiResponse {
        status: response.status,
        message: response.message,
        data,
    })
}

fn product_page(response: ApiResponsePaginationProduct) -> ApiResponsePagination<Vec<ProductResponse>> {
    ApiResponsePagination {
        status: response.status,
        message: response.message,
        data: response.data.into_iter().map(ProductResponse::from).collect(),
        pagination: response.pagination.map(Into::into).unwrap_or_default(),
    }
}

#[async_trait]
impl ProductGrpcClientTrait for ProductGrpcClientService {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<ProductResponse>>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.find_all",
            vec![
                KeyValue::new("page", req.page.to_string()),
                KeyValue::new("page_size", req.page_size.to_string()),
                KeyValue::new("search", req.search.clone()),
            ],
        );

        let result = self
            .resilience
            .call("find_all", || {
                let mut client = self.query_client.clone();
                let mut request = Request::new(FindAllRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .find_all(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    Ok(product_page(response.into_inner()))
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched products");
        result
    }

    async fn find_by_id(&self, id: i32) -> Result<Fetched<ProductResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.find_by_id",
            vec![KeyValue::new("product.id", id.to_string())],
        );

        let result = self
            .resilience
            .call_with_fallback(
                "find_by_id",
                || {
                    let mut client = self.query_client.clone();
                    let mut request = Request::new(FindByIdRequest { id });
                    self.tracer
                        .inject_trace_context(&tracing_ctx.cx, &mut request);

                    async move {
                        let response = client
                            .find_by_id(request)
                            .await
                            .map_err(grpc_status_to_service_error)?;

                        product_reply(response.into_inner()).map(Fetched::fresh)
                    }
                },
                |err| self.cache.fallback(id, err),
            )
            .await;

        if let Ok(fetched) = &result {
            self.cache.remember(id, fetched);
        }

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched product");
        result
    }

    async fn create(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.create",
            vec![KeyValue::new("product.name", req.name.clone())],
        );

        let result = self
            .create_resilience
            .call("create", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(CreateProductRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .create(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    product_reply(response.into_inner())
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Created product");
        result
    }

    async fn update(
        &self,
        req: &UpdateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError> {
        let id = req.product_id.unwrap_or_default();
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.update",
            vec![KeyValue::new("product.id", id.to_string())],
        );

        let result = self
            .resilience
            .call("update", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(UpdateProductRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .update(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    product_reply(response.into_inner())
                }
            })
            .await;

        if let Ok(response) = &result {
            self.cache.put(id, response.clone());
        }

        self.tracer
            .complete(&tracing_ctx, Method::Put, &result, "Updated product");
        result
    }

    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.delete",
            vec![KeyValue::new("product.id", id.to_string())],
        );

        let result = self
            .resilience
            .call("delete", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(FindByIdRequest { id });
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .delete(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    Ok(DeleteResponse::from(response.into_inner()))
                }
            })
            .await;

        if result.is_ok() {
            self.cache.invalidate(id);
        }

        self.tracer
            .complete(&tracing_ctx, Method::Delete, &result, "Deleted product");
        result
    }
}
