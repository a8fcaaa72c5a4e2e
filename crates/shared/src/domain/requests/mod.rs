mod order;
mod product;
mod user;

pub use self::order::{
    CreateOrderRequest, OrderLineRequest, TransitionOrderRequest, UpdateOrderRequest,
};
pub use self::product::{
    CreateProductRequest, ReserveStockRequest, StockLine, UpdateProductRequest,
};
pub use self::user::{Address, CreateUserRequest, UpdateUserRequest};

use genproto::common::FindAllRequest as FindAllRequestProto;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, IntoParams, Clone)]
pub struct FindAllRequest {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i32,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: i32,

    #[serde(default)]
    pub search: String,
}

fn default_page() -> i32 {
    1
}

fn default_page_size() -> i32 {
    10
}

impl Default for FindAllRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            search: String::new(),
        }
    }
}

impl From<FindAllRequestProto> for FindAllRequest {
    fn from(value: FindAllRequestProto) -> Self {
        Self {
            page: value.page,
            page_size: value.page_size,
            search: value.search,
        }
    }
}

impl From<FindAllRequest> for FindAllRequestProto {
    fn from(value: FindAllRequest) -> Self {
        Self {
            page: value.page,
            page_size: value.page_size,
            search: value.search,
        }
    }
}
