use crate::domain::{DeleteResponse, Fetched};
use async_trait::async_trait;
use shared::{
    domain::{
        requests::{
            CreateOrderRequest, FindAllRequest, TransitionOrderRequest, UpdateOrderRequest,
        },
        responses::{ApiResponse, ApiResponsePagination, OrderResponse},
    },
    errors::ServiceError,
};
use std::sync::Arc;

pub type DynOrderGrpcClient = Arc<dyn OrderGrpcClientTrait + Send + Sync>;

#[async_trait]
pub trait OrderGrpcClientTrait {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<Fetched<OrderResponse>, ServiceError>;
    async fn create(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn update(
        &self,
        req: &UpdateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError>;
    async fn transition(
        &self,
        req: &TransitionOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
}
