use async_trait::async_trait;
use shared::{
    domain::{
        requests::{CreateUserRequest, FindAllRequest, UpdateUserRequest},
        responses::{ApiResponse, ApiResponsePagination, UserResponse},
    },
    errors::ServiceError,
};
use std::sync::Arc;

pub type DynUserQueryService = Arc<dyn UserQueryServiceTrait + Send + Sync>;
pub type DynUserCommandService = Arc<dyn UserCommandServiceTrait + Send + Sync>;

#[async_trait]
pub trait UserQueryServiceTrait {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<UserResponse>>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<ApiResponse<UserResponse>, ServiceError>;
}

#[async_trait]
pub trait UserCommandServiceTrait {
    async fn create_user(
        &self,
        req: &CreateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError>;
    async fn update_user(
        &self,
        req: &UpdateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError>;
    async fn delete_user(&self, id: i32) -> Result<ApiResponse<()>, ServiceError>;
}
