use async_trait::async_trait;
use shared::{
    domain::{
        requests::{
            CreateProductRequest, FindAllRequest, ReserveStockRequest, UpdateProductRequest,
        },
        responses::{ApiResponse, ApiResponsePagination, ProductResponse, ReservationResponse},
    },
    errors::ServiceError,
};
use std::sync::Arc;
use uuid::Uuid;

pub type DynProductQueryService = Arc<dyn ProductQueryServiceTrait + Send + Sync>;
pub type DynProductCommandService = Arc<dyn ProductCommandServiceTrait + Send + Sync>;

#[async_trait]
pub trait ProductQueryServiceTrait {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<ProductResponse>>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<ApiResponse<ProductResponse>, ServiceError>;
}

#[async_trait]
pub trait ProductCommandServiceTrait {
    async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError>;
    async fn update_product(
        &self,
        req: &UpdateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError>;
    async fn delete_product(&self, id: i32) -> Result<ApiResponse<()>, ServiceError>;
    async fn reserve_stock(
        &self,
        req: &ReserveStockRequest,
    ) -> Result<ApiResponse<ReservationResponse>, ServiceError>;
    async fn release_stock(&self, reservation_id: Uuid) -> Result<ApiResponse<()>, ServiceError>;
}
