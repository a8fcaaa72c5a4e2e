use crate::model::{NewOrder, Order as OrderModel, OrderLine, OrderStatusUpdate};
use async_trait::async_trait;
use shared::{domain::requests::FindAllRequest, errors::RepositoryError};
use std::sync::Arc;

pub type DynOrderQueryRepository = Arc<dyn OrderQueryRepositoryTrait + Send + Sync>;
pub type DynOrderCommandRepository = Arc<dyn OrderCommandRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait OrderQueryRepositoryTrait {
    /// `search` matches the status text.
    async fn find_all(&self, req: &FindAllRequest)
    -> Result<(Vec<OrderModel>, i64), RepositoryError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<OrderModel>, RepositoryError>;
}

/// Every write except `create_order` is guarded by `expected_version` and
/// yields `Conflict` when the row moved on.
#[async_trait]
pub trait OrderCommandRepositoryTrait {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderModel, RepositoryError>;
    async fn update_lines(
        &self,
        order_id: i32,
        expected_version: i64,
        lines: &[OrderLine],
    ) -> Result<OrderModel, RepositoryError>;
    async fn update_status(
        &self,
        order_id: i32,
        expected_version: i64,
        update: &OrderStatusUpdate,
    ) -> Result<OrderModel, RepositoryError>;
    async fn delete_order(&self, order_id: i32, expected_version: i64)
    -> Result<(), RepositoryError>;
}
