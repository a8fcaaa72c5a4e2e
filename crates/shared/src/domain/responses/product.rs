use crate::domain::requests::StockLine;
use genproto::product::{
    ProductResponse as ProductResponseProto, ReservationResponse as ReservationResponseProto,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i32,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ReservationResponse {
    pub reservation_id: String,
    pub lines: Vec<StockLine>,
    pub released: bool,
    pub created_at: String,
}

// proto to response
impl From<ProductResponseProto> for ProductResponse {
    fn from(value: ProductResponseProto) -> Self {
        ProductResponse {
            id: value.id,
            name: value.name,
            description: value.description,
            price: value.price,
            stock: value.stock,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

// response to proto
impl From<ProductResponse> for ProductResponseProto {
    fn from(value: ProductResponse) -> Self {
        ProductResponseProto {
            id: value.id,
            name: value.name,
            description: value.description,
            price: value.price,
            stock: value.stock,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<ReservationResponseProto> for ReservationResponse {
    fn from(value: ReservationResponseProto) -> Self {
        ReservationResponse {
            reservation_id: value.reservation_id,
            lines: value.lines.into_iter().map(Into::into).collect(),
            released: value.released,
            created_at: value.created_at,
        }
    }
}

impl From<ReservationResponse> for ReservationResponseProto {
    fn from(value: ReservationResponse) -> Self {
        ReservationResponseProto {
            reservation_id: value.reservation_id,
            lines: value.lines.into_iter().map(Into::into).collect(),
            released: value.released,
            created_at: value.created_at,
        }
    }
}
