use crate::abstract_trait::UserClientTrait;
use async_trait::async_trait;
use genproto::{common::FindByIdRequest, user::user_query_service_client::UserQueryServiceClient};
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::responses::UserResponse,
    errors::{ServiceError, grpc_status_to_service_error},
    resilience::Resilience,
    utils::{Method, OperationTracer},
};
use tonic::{Request, transport::Channel};

#[derive(Clone)]
pub struct UserGrpcClientService {
    client: UserQueryServiceClient<Channel>,
    resilience: Resilience,
    tracer: OperationTracer,
}

impl UserGrpcClientService {
    pub fn new(
        client: UserQueryServiceClient<Channel>,
        resilience: Resilience,
        registry: &mut Registry,
    ) -> Self {
        let tracer = OperationTracer::new("order-user-client");
        tracer.register(registry);

        Self {
            client,
            resilience,
            tracer,
        }
    }
}

#[async_trait]
impl UserClientTrait for UserGrpcClientService {
    async fn find_by_id(&self, id: i32) -> Result<UserResponse, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "user_client.find_by_id",
            vec![KeyValue::new("user.id", id.to_string())],
        );

        let result = self
            .resilience
            .call("find_by_id", || {
                let mut client = self.client.clone();
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
                        .map(UserResponse::from)
                        .ok_or_else(|| {
                            ServiceError::Internal("user-service returned no user data".into())
                        })
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched user");
        result
    }
}
