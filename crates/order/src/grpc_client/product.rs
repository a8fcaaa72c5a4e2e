use crate::abstract_trait::ProductClientTrait;
use async_trait::async_trait;
use genproto::{
    common::FindByIdRequest,
    product::{
        ReleaseStockRequest, ReserveStockRequest as ReserveStockRequestProto,
        product_command_service_client::ProductCommandServiceClient,
        product_query_service_client::ProductQueryServiceClient,
    },
};
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::ReserveStockRequest,
        responses::{ProductResponse, ReservationResponse},
    },
    errors::{ServiceError, grpc_status_to_service_error},
    resilience::Resilience,
    utils::{Method, OperationTracer},
};
use tonic::{Request, transport::Channel};
use uuid::Uuid;

#[derive(Clone)]
pub struct ProductGrpcClientService {
    query_client: ProductQueryServiceClient<Channel>,
    command_client: ProductCommandServiceClient<Channel>,
    resilience: Resilience,
    tracer: OperationTracer,
}

impl ProductGrpcClientService {
    pub fn new(
        query_client: ProductQueryServiceClient<Channel>,
        command_client: ProductCommandServiceClient<Channel>,
        resilience: Resilience,
        registry: &mut Registry,
    ) -> Self {
        let tracer = OperationTracer::new("order-product-client");
        tracer.register(registry);

        Self {
            query_client,
            command_client,
            resilience,
            tracer,
        }
    }
}

#[async_trait]
impl ProductClientTrait for ProductGrpcClientService {
    async fn find_by_id(&self, id: i32) -> Result<ProductResponse, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.find_by_id",
            vec![KeyValue::new("product.id", id.to_string())],
        );

        let result = self
            .resilience
            .call("find_by_id", || {
                let mut client = self.query_client.clone();
                let mut request = Request::new(FindByIdRequest { id });
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .find_by_id(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    response
                        .into_inner()
                        .data
                        .map(ProductResponse::from)
                        .ok_or_else(|| {
                            ServiceError::Internal("product-service returned no product data".into())
                        })
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched product");
        result
    }

    async fn reserve_stock(
        &self,
        req: &ReserveStockRequest,
    ) -> Result<ReservationResponse, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.reserve_stock",
            vec![KeyValue::new("reservation.id", req.reservation_id.to_string())],
        );

        let result = self
            .resilience
            .call("reserve_stock", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(ReserveStockRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .reserve_stock(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    response
                        .into_inner()
                        .data
                        .map(ReservationResponse::from)
                        .ok_or_else(|| {
                            ServiceError::Internal(
                                "product-service returned no reservation data".into(),
                            )
                        })
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Reserved stock");
        result
    }

    async fn release_stock(&self, reservation_id: Uuid) -> Result<(), ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "product_client.release_stock",
            vec![KeyValue::new("reservation.id", reservation_id.to_string())],
        );

        let result = self
            .resilience
            .call("release_stock", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(ReleaseStockRequest {
                    reservation_id: reservation_id.to_string(),
                });
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    client
                        .release_stock(request)
                        .await
                        .map(|_| ())
                        .map_err(grpc_status_to_service_error)
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Released stock");
        result
    }
}
