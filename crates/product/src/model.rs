use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{
    requests::StockLine,
    responses::{ProductResponse, ReservationResponse},
};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: i32,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i32,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock taken out for one order. Keyed by the order's reservation id so a
/// repeated reserve call never debits twice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockReservation {
    pub reservation_id: Uuid,
    pub lines: Json<Vec<StockLine>>,
    pub released: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of a reserve attempt. Shortfalls are reported, not raised, so the
/// service can turn them into validation errors.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    Reserved(StockReservation),
    AlreadyReserved(StockReservation),
    Insufficient {
        product_id: i32,
        requested: i32,
        available: i32,
    },
    UnknownProduct(i32),
}

// model to response
impl From<Product> for ProductResponse {
    fn from(value: Product) -> Self {
        ProductResponse {
            id: value.product_id,
            name: value.name,
            description: value.description,
            price: value.price,
            stock: value.stock,
            version: value.version,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

impl From<StockReservation> for ReservationResponse {
    fn from(value: StockReservation) -> Self {
        ReservationResponse {
            reservation_id: value.reservation_id.to_string(),
            lines: value.lines.0,
            released: value.released,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}
