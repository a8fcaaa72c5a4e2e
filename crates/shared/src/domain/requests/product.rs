use genproto::product::{
    CreateProductRequest as CreateProductRequestProto, ReserveStockRequest as ReserveStockProto,
    StockLine as StockLineProto, UpdateProductRequest as UpdateProductRequestProto,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(range(min = 0))]
    pub price: i64,

    #[validate(range(min = 0))]
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub product_id: Option<i32>,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(range(min = 0))]
    pub price: i64,

    #[validate(range(min = 0))]
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
    #[validate(range(min = 1))]
    pub product_id: i32,

    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReserveStockRequest {
    pub reservation_id: Uuid,

    #[validate(length(min = 1, message = "a reservation needs at least one line"), nested)]
    pub lines: Vec<StockLine>,
}

impl From<CreateProductRequestProto> for CreateProductRequest {
    fn from(value: CreateProductRequestProto) -> Self {
        Self {
            name: value.name,
            description: value.description,
            price: value.price,
            stock: value.stock,
        }
    }
}

impl From<CreateProductRequest> for CreateProductRequestProto {
    fn from(value: CreateProductRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
            price: value.price,
            stock: value.stock,
        }
    }
}

impl From<UpdateProductRequestProto> for UpdateProductRequest {
    fn from(value: UpdateProductRequestProto) -> Self {
        Self {
            product_id: Some(value.id),
            name: value.name,
            description: value.description,
            price: value.price,
            stock: value.stock,
        }
    }
}

impl From<UpdateProductRequest> for UpdateProductRequestProto {
    fn from(value: UpdateProductRequest) -> Self {
        Self {
            id: value.product_id.unwrap_or_default(),
            name: value.name,
            description: value.description,
            price: value.price,
            stock: value.stock,
        }
    }
}

impl From<StockLineProto> for StockLine {
    fn from(value: StockLineProto) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
        }
    }
}

impl From<StockLine> for StockLineProto {
    fn from(value: StockLine) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
        }
    }
}

impl TryFrom<ReserveStockProto> for ReserveStockRequest {
    type Error = ServiceError;

    fn try_from(value: ReserveStockProto) -> Result<Self, Self::Error> {
        let reservation_id = Uuid::parse_str(&value.reservation_id)
            .map_err(|e| ServiceError::validation(format!("reservation_id: {e}")))?;

        Ok(Self {
            reservation_id,
            lines: value.lines.into_iter().map(Into::into).collect(),
        })
    }
}

impl From<ReserveStockRequest> for ReserveStockProto {
    fn from(value: ReserveStockRequest) -> Self {
        Self {
            reservation_id: value.reservation_id.to_string(),
            lines: value.lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_price_and_stock_are_rejected() {
        let req = CreateProductRequest {
            name: "Widget".into(),
            description: String::new(),
            price: -1,
            stock: -5,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("stock"));
    }

    #[test]
    fn malformed_reservation_id_is_a_validation_error() {
        let proto = ReserveStockProto {
            reservation_id: "nope".into(),
            lines: vec![],
        };

        let err = ReserveStockRequest::try_from(proto).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
