use crate::domain::{DeleteResponse, Fetched};
use async_trait::async_trait;
use shared::{
    domain::{
        requests::{CreateUserRequest, FindAllRequest, UpdateUserRequest},
        responses::{ApiResponse, ApiResponsePagination, UserResponse},
    },
    errors::ServiceError,
};
use std::sync::Arc;

pub type DynUserGrpcClient = Arc<dyn UserGrpcClientTrait + Send + Sync>;

#[async_trait]
pub trait UserGrpcClientTrait {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<UserResponse>>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<Fetched<UserResponse>, ServiceError>;
    async fn create(
        &self,
        req: &CreateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError>;
    async fn update(
        &self,
        req: &UpdateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError>;
    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError>;
}
