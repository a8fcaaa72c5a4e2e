use genproto::order::{OrderLine as OrderLineProto, OrderResponse as OrderResponseProto};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct OrderLineResponse {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: i64,
}

/// An order refers to its customer by id only; user details are fetched
/// from the user service when needed.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct OrderResponse {
    pub id: i32,
    pub user_id: i32,
    pub lines: Vec<OrderLineResponse>,
    pub total_price: i64,
    pub status: String,
    pub reservation_id: String,
    pub payment_id: Option<String>,
    /// Set while a pay or cancel is still settling with other services.
    pub pending_event: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<OrderLineProto> for OrderLineResponse {
    fn from(value: OrderLineProto) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
            unit_price: value.unit_price,
        }
    }
}

impl From<OrderLineResponse> for OrderLineProto {
    fn from(value: OrderLineResponse) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
            unit_price: value.unit_price,
        }
    }
}

// proto to response
impl From<OrderResponseProto> for OrderResponse {
    fn from(value: OrderResponseProto) -> Self {
        OrderResponse {
            id: value.id,
            user_id: value.user_id,
            lines: value.lines.into_iter().map(Into::into).collect(),
            total_price: value.total_price,
            status: value.status,
            reservation_id: value.reservation_id,
            payment_id: value.payment_id,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
            pending_event: value.pending_event,
        }
    }
}

// response to proto
impl From<OrderResponse> for OrderResponseProto {
    fn from(value: OrderResponse) -> Self {
        OrderResponseProto {
            id: value.id,
            user_id: value.user_id,
            lines: value.lines.into_iter().map(Into::into).collect(),
            total_price: value.total_price,
            status: value.status,
            reservation_id: value.reservation_id,
            payment_id: value.payment_id,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
            pending_event: value.pending_event,
        }
    }
}
