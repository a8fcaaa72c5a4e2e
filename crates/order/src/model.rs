use crate::domain::{OrderEvent, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{
        requests::StockLine,
        responses::{OrderLineResponse, OrderResponse},
    },
    errors::ServiceError,
};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

/// One order line. `unit_price` is the product price captured when the line
/// was written and never follows later price changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: i32,
    pub user_id: i32,
    pub lines: Json<Vec<OrderLine>>,
    pub status: String,
    pub reservation_id: Uuid,
    /// Idempotency key of the current payment attempt.
    pub payment_key: Uuid,
    pub payment_id: Option<String>,
    /// The pay or cancel currently holding the order, if any.
    pub pending_event: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn status(&self) -> Result<OrderStatus, ServiceError> {
        self.status.parse()
    }

    pub fn pending(&self) -> Result<Option<OrderEvent>, ServiceError> {
        self.pending_event
            .as_deref()
            .map(|event| {
                event.parse().map_err(|_| {
                    ServiceError::Internal(format!("unknown pending event in store: {event}"))
                })
            })
            .transpose()
    }

    /// The saga columns as stored, to be tweaked and written back.
    pub fn status_update(&self) -> Result<OrderStatusUpdate, ServiceError> {
        Ok(OrderStatusUpdate {
            status: self.status()?,
            reservation_id: self.reservation_id,
            payment_key: self.payment_key,
            payment_id: self.payment_id.clone(),
            pending: self.pending()?,
        })
    }

    pub fn total_price(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| i64::from(line.quantity) * line.unit_price)
            .sum()
    }

    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.lines
            .iter()
            .map(|line| StockLine {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect()
    }
}

/// Fields of an order before the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub lines: Vec<OrderLine>,
    pub reservation_id: Uuid,
    pub payment_key: Uuid,
}

/// Saga-owned columns written together on every status change.
#[derive(Debug, Clone)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    pub reservation_id: Uuid,
    pub payment_key: Uuid,
    pub payment_id: Option<String>,
    pub pending: Option<OrderEvent>,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(value: OrderLine) -> Self {
        OrderLineResponse {
            product_id: value.product_id,
            quantity: value.quantity,
            unit_price: value.unit_price,
        }
    }
}

// model to response
impl From<Order> for OrderResponse {
    fn from(value: Order) -> Self {
        let total_price = value.total_price();

        OrderResponse {
            id: value.order_id,
            user_id: value.user_id,
            lines: value.lines.0.into_iter().map(Into::into).collect(),
            total_price,
            status: value.status,
            reservation_id: value.reservation_id.to_string(),
            payment_id: value.payment_id,
            pending_event: value.pending_event,
            version: value.version,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_derived_from_line_snapshots() {
        let now = Utc::now();
        let order = Order {
            order_id: 1,
            user_id: 9,
            lines: Json(vec![
                OrderLine {
                    product_id: 1,
                    quantity: 3,
                    unit_price: 2_500,
                },
                OrderLine {
                    product_id: 2,
                    quantity: 1,
                    unit_price: 99_000,
                },
            ]),
            status: OrderStatus::Created.to_string(),
            reservation_id: Uuid::new_v4(),
            payment_key: Uuid::new_v4(),
            payment_id: None,
            pending_event: Some("pay".into()),
            version: 1,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(order.total_price(), 106_500);
        assert_eq!(order.status().unwrap(), OrderStatus::Created);
        assert_eq!(order.pending().unwrap(), Some(OrderEvent::Pay));

        let response = OrderResponse::from(order);
        assert_eq!(response.total_price, 106_500);
        assert_eq!(response.user_id, 9);
        assert_eq!(response.pending_event.as_deref(), Some("pay"));
    }
}
