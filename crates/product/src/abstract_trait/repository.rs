use crate::model::{Product as ProductModel, ReserveOutcome};
use async_trait::async_trait;
use shared::{
    domain::requests::{
        CreateProductRequest, FindAllRequest, ReserveStockRequest, UpdateProductRequest,
    },
    errors::RepositoryError,
};
use std::sync::Arc;
use uuid::Uuid;

pub type DynProductQueryRepository = Arc<dyn ProductQueryRepositoryTrait + Send + Sync>;
pub type DynProductCommandRepository = Arc<dyn ProductCommandRepositoryTrait + Send + Sync>;
pub type DynStockRepository = Arc<dyn StockRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait ProductQueryRepositoryTrait {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<(Vec<ProductModel>, i64), RepositoryError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<ProductModel>, RepositoryError>;
}

#[async_trait]
pub trait ProductCommandRepositoryTrait {
    async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ProductModel, RepositoryError>;

    /// Versioned write; a stale `expected_version` yields `Conflict`.
    async fn update_product(
        &self,
        product_id: i32,
        expected_version: i64,
        req: &UpdateProductRequest,
    ) -> Result<ProductModel, RepositoryError>;

    async fn delete_product(&self, product_id: i32) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait StockRepositoryTrait {
    /// Debits every line or none.
    async fn reserve_stock(&self, req: &ReserveStockRequest)
    -> Result<ReserveOutcome, RepositoryError>;

    /// Returns `true` when quantities went back to stock, `false` when the
    /// reservation is unknown or was already released.
    async fn release_stock(&self, reservation_id: Uuid) -> Result<bool, RepositoryError>;
}
