use genproto::order::{
    CreateOrderRequest as CreateOrderRequestProto, OrderLineRequest as OrderLineRequestProto,
    TransitionOrderRequest as TransitionOrderRequestProto,
    UpdateOrderRequest as UpdateOrderRequestProto,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    #[validate(range(min = 1))]
    pub product_id: i32,

    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone)]
pub struct CreateOrderRequest {
    #[validate(range(min = 1))]
    pub user_id: i32,

    #[validate(
        length(min = 1, message = "an order needs at least one line"),
        custom(function = "unique_products"),
        nested
    )]
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub order_id: Option<i32>,

    #[validate(
        length(min = 1, message = "an order needs at least one line"),
        custom(function = "unique_products"),
        nested
    )]
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone)]
pub struct TransitionOrderRequest {
    #[serde(default)]
    pub order_id: Option<i32>,

    /// `pay`, `fulfill` or `cancel`.
    #[validate(length(min = 1))]
    pub event: String,
}

fn unique_products(lines: &[OrderLineRequest]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(lines.len());

    if lines.iter().all(|line| seen.insert(line.product_id)) {
        Ok(())
    } else {
        Err(ValidationError::new("duplicate_product")
            .with_message("each product may appear on only one line".into()))
    }
}

impl From<OrderLineRequestProto> for OrderLineRequest {
    fn from(value: OrderLineRequestProto) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
        }
    }
}

impl From<OrderLineRequest> for OrderLineRequestProto {
    fn from(value: OrderLineRequest) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
        }
    }
}

impl From<CreateOrderRequestProto> for CreateOrderRequest {
    fn from(value: CreateOrderRequestProto) -> Self {
        Self {
            user_id: value.user_id,
            lines: value.lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<CreateOrderRequest> for CreateOrderRequestProto {
    fn from(value: CreateOrderRequest) -> Self {
        Self {
            user_id: value.user_id,
            lines: value.lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<UpdateOrderRequestProto> for UpdateOrderRequest {
    fn from(value: UpdateOrderRequestProto) -> Self {
        Self {
            order_id: Some(value.id),
            lines: value.lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<UpdateOrderRequest> for UpdateOrderRequestProto {
    fn from(value: UpdateOrderRequest) -> Self {
        Self {
            id: value.order_id.unwrap_or_default(),
            lines: value.lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TransitionOrderRequestProto> for TransitionOrderRequest {
    fn from(value: TransitionOrderRequestProto) -> Self {
        Self {
            order_id: Some(value.id),
            event: value.event,
        }
    }
}

impl From<TransitionOrderRequest> for TransitionOrderRequestProto {
    fn from(value: TransitionOrderRequest) -> Self {
        Self {
            id: value.order_id.unwrap_or_default(),
            event: value.event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;

    fn line(product_id: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn accepts_a_well_formed_order() {
        let req = CreateOrderRequest {
            user_id: 7,
            lines: vec![line(1, 2), line(2, 1)],
        };

        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_empty_lines_and_missing_user() {
        let req = CreateOrderRequest {
            user_id: 0,
            lines: vec![],
        };

        let err = ServiceError::from(req.validate().unwrap_err());
        let ServiceError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert!(messages.iter().any(|m| m.starts_with("user_id")));
        assert!(messages.iter().any(|m| m.starts_with("lines")));
    }

    #[test]
    fn rejects_duplicate_products_and_zero_quantity() {
        let duplicate = CreateOrderRequest {
            user_id: 1,
            lines: vec![line(3, 1), line(3, 2)],
        };
        assert!(duplicate.validate().is_err());

        let zero = CreateOrderRequest {
            user_id: 1,
            lines: vec![line(3, 0)],
        };
        let err = ServiceError::from(zero.validate().unwrap_err());
        let ServiceError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert!(messages.iter().any(|m| m.contains("quantity")));
    }
}
