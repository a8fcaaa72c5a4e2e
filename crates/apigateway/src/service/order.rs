use crate::{
    abstract_trait::OrderGrpcClientTrait,
    cache::StaleCache,
    domain::{DeleteResponse, Fetched},
};
use async_trait::async_trait;
use genproto::{
    common::{FindAllRequest as FindAllRequestProto, FindByIdRequest},
    order::{
        ApiResponseOrder, ApiResponsePaginationOrder, CreateOrderRequest as CreateOrderRequestProto,
        TransitionOrderRequest as TransitionOrderRequestProto,
        UpdateOrderRequest as UpdateOrderRequestProto,
        order_command_service_client::OrderCommandServiceClient,
        order_query_service_client::OrderQueryServiceClient,
    },
};
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::{
            CreateOrderRequest, FindAllRequest, TransitionOrderRequest, UpdateOrderRequest,
        },
        responses::{ApiResponse, ApiResponsePagination, OrderResponse},
    },
    errors::{ServiceError, grpc_status_to_service_error},
    resilience::Resilience,
    utils::{Method, OperationTracer},
};
use std::sync::Arc;
use tonic::{Request, transport::Channel};

#[derive(Clone)]
pub struct OrderGrpcClientService {
    query_client: OrderQueryServiceClient<Channel>,
    command_client: OrderCommandServiceClient<Channel>,
    resilience: Resilience,
    /// Creates carry no idempotency key, so they are never retried.
    create_resilience: Resilience,
    tracer: OperationTracer,
    cache: Arc<StaleCache<OrderResponse>>,
}

impl OrderGrpcClientService {
    pub fn new(
        query_client: OrderQueryServiceClient<Channel>,
        command_client: OrderCommandServiceClient<Channel>,
        resilience: Resilience,
        cache_capacity: usize,
        registry: &mut Registry,
    ) -> Self {
        let tracer = OperationTracer::new("apigateway-order-client");
        tracer.register(registry);

        Self {
            query_client,
            command_client,
            create_resilience: resilience.without_retry(),
            resilience,
            tracer,
            cache: Arc::new(StaleCache::new("orders", cache_capacity)),
        }
    }
}

fn order_reply(response: ApiResponseOrder) -> Result<ApiResponse<OrderResponse>, ServiceError> {
    let data = response
        .data
        .map(OrderResponse::from)
        .ok_or_else(|| ServiceError::Internal("order-service returned no order data".into()))?;

    Ok(ApiResponse {
        status: response.status,
        message: response.message,
        data,
    })
}

fn order_page(response: ApiResponsePaginationOrder) -> ApiResponsePagination<Vec<OrderResponse>> {
    ApiResponsePagination {
        status: response.status,
        message: response.message,
        data: response.data.into_iter().map(OrderResponse::from).collect(),
        pagination: response.pagination.map(Into::into).unwrap_or_default(),
    }
}

#[async_trait]
impl OrderGrpcClientTrait for OrderGrpcClientService {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "order_client.find_all",
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

                    Ok(order_page(response.into_inner()))
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched orders");
        result
    }

    async fn find_by_id(&self, id: i32) -> Result<Fetched<OrderResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "order_client.find_by_id",
            vec![KeyValue::new("order.id", id.to_string())],
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

                        order_reply(response.into_inner()).map(Fetched::fresh)
                    }
                },
                |err| self.cache.fallback(id, err),
            )
            .await;

        if let Ok(fetched) = &result {
            self.cache.remember(id, fetched);
        }

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched order");
        result
    }

    async fn create(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "order_client.create",
            vec![
                KeyValue::new("user.id", req.user_id.to_string()),
                KeyValue::new("order.lines", req.lines.len().to_string()),
            ],
        );

        let result = self
            .create_resilience
            .call("create", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(CreateOrderRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .create(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    order_reply(response.into_inner())
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Created order");
        result
    }

    async fn update(
        &self,
        req: &UpdateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let id = req.order_id.unwrap_or_default();
        let tracing_ctx = self.tracer.start_tracing(
            "order_client.update",
            vec![KeyValue::new("order.id", id.to_string())],
        );

        let result = self
            .resilience
            .call("update", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(UpdateOrderRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .update(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    order_reply(response.into_inner())
                }
            })
            .await;

        if let Ok(response) = &result {
            self.cache.put(id, response.clone());
        }

        self.tracer
            .complete(&tracing_ctx, Method::Put, &result, "Updated order");
        result
    }

    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "order_client.delete",
            vec![KeyValue::new("order.id", id.to_string())],
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
            .complete(&tracing_ctx, Method::Delete, &result, "Deleted order");
        result
    }

    async fn transition(
        &self,
        req: &TransitionOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let id = req.order_id.unwrap_or_default();
        let tracing_ctx = self.tracer.start_tracing(
            "order_client.transition",
            vec![
                KeyValue::new("order.id", id.to_string()),
                KeyValue::new("order.event", req.event.clone()),
            ],
        );

        let result = self
            .resilience
            .call("transition", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(TransitionOrderRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .transition(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    order_reply(response.into_inner())
                }
            })
            .await;

        if let Ok(response) = &result {
            self.cache.put(id, response.clone());
        }

        self.tracer
            .complete(&tracing_ctx, Method::Put, &result, "Transitioned order");
        result
    }
}
