use async_trait::async_trait;
use shared::{
    domain::{
        requests::{CreateOrderRequest, FindAllRequest, TransitionOrderRequest, UpdateOrderRequest},
        responses::{ApiResponse, ApiResponsePagination, OrderResponse},
    },
    errors::ServiceError,
};
use std::sync::Arc;

pub type DynOrderQueryService = Arc<dyn OrderQueryServiceTrait + Send + Sync>;
pub type DynOrderCommandService = Arc<dyn OrderCommandServiceTrait + Send + Sync>;

#[async_trait]
pub trait OrderQueryServiceTrait {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<ApiResponse<OrderResponse>, ServiceError>;
}

#[async_trait]
pub trait OrderCommandServiceTrait {
    async fn create_order(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn update_order(
        &self,
        req: &UpdateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn delete_order(&self, id: i32) -> Result<ApiResponse<()>, ServiceError>;
    async fn transition(
        &self,
        req: &TransitionOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
}
