use crate::domain::{DeleteResponse, Fetched};
use async_trait::async_trait;
use shared::{
    domain::{
        requests::{CreateProductRequest, FindAllRequest, UpdateProductRequest},
        responses::{ApiResponse, ApiResponsePagination, ProductResponse},
    },
    errors::ServiceError,
};
use std::sync::Arc;

pub type DynProductGrpcClient = Arc<dyn ProductGrpcClientTrait + Send + Sync>;

#[async_trait]
pub trait ProductGrpcClientTrait {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<ProductResponse>>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<Fetched<ProductResponse>, ServiceError>;
    async fn create(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError>;
    async fn update(
        &self,
        req: &UpdateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError>;
    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError>;
}
