use crate::domain::PaymentReceipt;
use async_trait::async_trait;
use shared::{
    domain::{
        requests::ReserveStockRequest,
        responses::{ProductResponse, ReservationResponse, UserResponse},
    },
    errors::ServiceError,
};
use std::sync::Arc;
use uuid::Uuid;

pub type DynUserClient = Arc<dyn UserClientTrait + Send + Sync>;
pub type DynProductClient = Arc<dyn ProductClientTrait + Send + Sync>;
pub type DynPaymentClient = Arc<dyn PaymentClientTrait + Send + Sync>;

/// Read-only view of the user service.
#[async_trait]
pub trait UserClientTrait {
    async fn find_by_id(&self, id: i32) -> Result<UserResponse, ServiceError>;
}

/// Product lookups plus the two stock operations the order saga needs.
/// Products themselves are never written from here.
#[async_trait]
pub trait ProductClientTrait {
    async fn find_by_id(&self, id: i32) -> Result<ProductResponse, ServiceError>;
    async fn reserve_stock(
        &self,
        req: &ReserveStockRequest,
    ) -> Result<ReservationResponse, ServiceError>;
    async fn release_stock(&self, reservation_id: Uuid) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait PaymentClientTrait {
    async fn capture(
        &self,
        idempotency_key: &str,
        order_id: i32,
        amount: i64,
    ) -> Result<PaymentReceipt, ServiceError>;
    async fn refund(
        &self,
        idempotency_key: &str,
        payment_id: &str,
        amount: i64,
    ) -> Result<PaymentReceipt, ServiceError>;
}
