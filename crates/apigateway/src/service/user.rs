use crate::{
    abstract_trait::UserGrpcClientTrait,
    cache::StaleCache,
    domain::{DeleteResponse, Fetched},
};
use async_trait::async_trait;
use genproto::{
    common::{FindAllRequest as FindAllRequestProto, FindByIdRequest},
    user::{
        ApiResponsePaginationUser, ApiResponseUser, CreateUserRequest as CreateUserRequestProto,
        UpdateUserRequest as UpdateUserRequestProto,
        user_command_service_client::UserCommandServiceClient,
        user_query_service_client::UserQueryServiceClient,
    },
};
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::{CreateUserRequest, FindAllRequest, UpdateUserRequest},
        responses::{ApiResponse, ApiResponsePagination, UserResponse},
    },
    errors::{ServiceError, grpc_status_to_service_error},
    resilience::Resilience,
    utils::{Method, OperationTracer},
};
use std::sync::Arc;
use tonic::{Request, transport::Channel};

#[derive(Clone)]
pub struct UserGrpcClientService {
    query_client: UserQueryServiceClient<Channel>,
    command_client: UserCommandServiceClient<Channel>,
    resilience: Resilience,
    /// Creates carry no idempotency key, so they are never retried.
    create_resilience: Resilience,
    tracer: OperationTracer,
    cache: Arc<StaleCache<UserResponse>>,
}

impl UserGrpcClientService {
    pub fn new(
        query_client: UserQueryServiceClient<Channel>,
        command_client: UserCommandServiceClient<Channel>,
        resilience: Resilience,
        cache_capacity: usize,
        registry: &mut Registry,
    ) -> Self {
        let tracer = OperationTracer::new("apigateway-user-client");
        tracer.register(registry);

        Self {
            query_client,
            command_client,
            create_resilience: resilience.without_retry(),
            resilience,
            tracer,
            cache: Arc::new(StaleCache::new("users", cache_capacity)),
        }
    }
}

fn user_reply(response: ApiResponseUser) -> Result<ApiResponse<UserResponse>, ServiceError> {
    let data = response
        .data
        .map(UserResponse::from)
        .ok_or_else(|| ServiceError::Internal("user-service returned no user data".into()))?;

    Ok(ApiResponse {
        status: response.status,
        message: response.message,
        data,
    })
}

fn user_page(response: ApiResponsePaginationUser) -> ApiResponsePagination<Vec<UserResponse>> {
    ApiResponsePagination {
        status: response.status,
        message: response.message,
        data: response.data.into_iter().map(UserResponse::from).collect(),
        pagination: response.pagination.map(Into::into).unwrap_or_default(),
    }
}

#[async_trait]
impl UserGrpcClientTrait for UserGrpcClientService {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<UserResponse>>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "user_client.find_all",
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

                    Ok(user_page(response.into_inner()))
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched users");
        result
    }

    async fn find_by_id(&self, id: i32) -> Result<Fetched<UserResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "user_client.find_by_id",
            vec![KeyValue::new("user.id", id.to_string())],
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

                        user_reply(response.into_inner()).map(Fetched::fresh)
                    }
                },
                |err| self.cache.fallback(id, err),
            )
            .await;

        if let Ok(fetched) = &result {
            self.cache.remember(id, fetched);
        }

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched user");
        result
    }

    async fn create(
        &self,
        req: &CreateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "user_client.create",
            vec![KeyValue::new("user.email", req.email.clone())],
        );

        let result = self
            .create_resilience
            .call("create", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(CreateUserRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .create(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    user_reply(response.into_inner())
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Created user");
        result
    }

    async fn update(
        &self,
        req: &UpdateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError> {
        let id = req.user_id.unwrap_or_default();
        let tracing_ctx = self.tracer.start_tracing(
            "user_client.update",
            vec![KeyValue::new("user.id", id.to_string())],
        );

        let result = self
            .resilience
            .call("update", || {
                let mut client = self.command_client.clone();
                let mut request = Request::new(UpdateUserRequestProto::from(req.clone()));
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    let response = client
                        .update(request)
                        .await
                        .map_err(grpc_status_to_service_error)?;

                    user_reply(response.into_inner())
                }
            })
            .await;

        if let Ok(response) = &result {
            self.cache.put(id, response.clone());
        }

        self.tracer
            .complete(&tracing_ctx, Method::Put, &result, "Updated user");
        result
    }

    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "user_client.delete",
            vec![KeyValue::new("user.id", id.to_string())],
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
            .complete(&tracing_ctx, Method::Delete, &result, "Deleted user");
        result
    }
}
