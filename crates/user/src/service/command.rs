use crate::abstract_trait::{
    DynUserCommandRepository, DynUserQueryRepository, UserCommandServiceTrait,
};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::{CreateUserRequest, UpdateUserRequest},
        responses::{ApiResponse, UserResponse},
    },
    errors::ServiceError,
    utils::{Method, OperationTracer, retry_on_conflict},
};
use tracing::info;
use validator::Validate;

#[derive(Clone)]
pub struct UserCommandService {
    query: DynUserQueryRepository,
    command: DynUserCommandRepository,
    tracer: OperationTracer,
}

pub struct UserCommandServiceDeps {
    pub query: DynUserQueryRepository,
    pub command: DynUserCommandRepository,
}

impl UserCommandService {
    pub fn new(deps: UserCommandServiceDeps, registry: &mut Registry) -> Self {
        let UserCommandServiceDeps { query, command } = deps;

        let tracer = OperationTracer::new("user-command-service");
        tracer.register(registry);

        Self {
            query,
            command,
            tracer,
        }
    }
}

#[async_trait]
impl UserCommandServiceTrait for UserCommandService {
    async fn create_user(
        &self,
        req: &CreateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError> {
        req.validate()?;

        info!("🏗️ Creating user {}", req.email);

        let tracing_ctx = self.tracer.start_tracing(
            "create_user",
            vec![
                KeyValue::new("component", "user"),
                KeyValue::new("operation", "create"),
            ],
        );

        let result = self
            .command
            .create_user(req)
            .await
            .map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "User created");

        Ok(ApiResponse::success(
            "User created successfully",
            UserResponse::from(result?),
        ))
    }

    async fn update_user(
        &self,
        req: &UpdateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError> {
        req.validate()?;

        let user_id = req
            .user_id
            .ok_or_else(|| ServiceError::validation("user_id: is required"))?;

        let tracing_ctx = self.tracer.start_tracing(
            "update_user",
            vec![
                KeyValue::new("component", "user"),
                KeyValue::new("operation", "update"),
                KeyValue::new("user.id", user_id.to_string()),
            ],
        );

        let query = &self.query;
        let command = &self.command;

        let result = retry_on_conflict("update_user", |_| async move {
            let current = query
                .find_by_id(user_id)
                .await?
                .ok_or_else(ServiceError::not_found)?;

            command
                .update_user(user_id, current.version, req)
                .await
                .map_err(ServiceError::from)
        })
        .await;

        self.tracer
            .complete(&tracing_ctx, Method::Put, &result, "User updated");

        Ok(ApiResponse::success(
            "User updated successfully",
            UserResponse::from(result?),
        ))
    }

    async fn delete_user(&self, id: i32) -> Result<ApiResponse<()>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "delete_user",
            vec![
                KeyValue::new("component", "user"),
                KeyValue::new("operation", "delete"),
                KeyValue::new("user.id", id.to_string()),
            ],
        );

        let result = self
            .command
            .delete_user(id)
            .await
            .map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Delete, &result, "User deleted");
        result?;

        Ok(ApiResponse::success("User deleted successfully", ()))
    }
}
