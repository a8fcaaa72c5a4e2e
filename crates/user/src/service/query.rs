use crate::abstract_trait::{DynUserQueryRepository, UserQueryServiceTrait};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::FindAllRequest,
        responses::{ApiResponse, ApiResponsePagination, Pagination, UserResponse},
    },
    errors::ServiceError,
    utils::{Method, OperationTracer},
};
use tracing::info;
use validator::Validate;

#[derive(Clone)]
pub struct UserQueryService {
    query: DynUserQueryRepository,
    tracer: OperationTracer,
}

impl UserQueryService {
    pub fn new(query: DynUserQueryRepository, registry: &mut Registry) -> Self {
        let tracer = OperationTracer::new("user-query-service");
        tracer.register(registry);

        Self { query, tracer }
    }
}

#[async_trait]
impl UserQueryServiceTrait for UserQueryService {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<UserResponse>>, ServiceError> {
        req.validate()?;

        let tracing_ctx = self.tracer.start_tracing(
            "find_all_users",
            vec![
                KeyValue::new("component", "user"),
                KeyValue::new("page", req.page.to_string()),
                KeyValue::new("search", req.search.clone()),
            ],
        );

        let result = self.query.find_all(req).await.map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched users");
        let (users, total) = result?;

        info!("📋 Found {} of {total} users", users.len());

        let data = users.into_iter().map(UserResponse::from).collect();

        Ok(ApiResponsePagination::success(
            "Users retrieved successfully",
            data,
            Pagination::new(req.page, req.page_size, total),
        ))
    }

    async fn find_by_id(&self, id: i32) -> Result<ApiResponse<UserResponse>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "find_user_by_id",
            vec![
                KeyValue::new("component", "user"),
                KeyValue::new("user.id", id.to_string()),
            ],
        );

        let result = match self.query.find_by_id(id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(ServiceError::not_found()),
            Err(e) => Err(ServiceError::from(e)),
        };

        self.tracer
            .complete(&tracing_ctx, Method::Get, &result, "Fetched user");

        Ok(ApiResponse::success(
            "User retrieved successfully",
            UserResponse::from(result?),
        ))
    }
}
