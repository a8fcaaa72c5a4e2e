use crate::domain::Fetched;
use genproto::common::ApiResponseDelete;
use serde::{Deserialize, Serialize};
use shared::domain::{
    requests::{
        CreateOrderRequest, CreateProductRequest, CreateUserRequest, UpdateOrderRequest,
        UpdateProductRequest, UpdateUserRequest,
    },
    responses::{ApiResponse, OrderResponse, ProductResponse, UserResponse},
};
use utoipa::ToSchema;

/// Any entity the gateway can return. Serialized without a tag, so clients
/// see the owning service's own shape.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ResourceEntity {
    User(UserResponse),
    Product(ProductResponse),
    Order(OrderResponse),
}

impl From<UserResponse> for ResourceEntity {
    fn from(value: UserResponse) -> Self {
        ResourceEntity::User(value)
    }
}

impl From<ProductResponse> for ResourceEntity {
    fn from(value: ProductResponse) -> Self {
        ResourceEntity::Product(value)
    }
}

impl From<OrderResponse> for ResourceEntity {
    fn from(value: OrderResponse) -> Self {
        ResourceEntity::Order(value)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntityResponse {
    pub status: String,
    pub message: String,
    pub data: ResourceEntity,
    /// True when the owning service was unavailable and this is the last
    /// copy the gateway saw.
    pub stale: bool,
}

impl<T: Into<ResourceEntity>> From<Fetched<T>> for EntityResponse {
    fn from(fetched: Fetched<T>) -> Self {
        let ApiResponse {
            status,
            message,
            data,
        } = fetched.response;

        Self {
            status,
            message,
            data: data.into(),
            stale: fetched.stale,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}

impl From<ApiResponseDelete> for DeleteResponse {
    fn from(value: ApiResponseDelete) -> Self {
        Self {
            status: value.status,
            message: value.message,
        }
    }
}

/// Request body of `POST /api/{resource}`; the variant is picked by resource.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CreateResourceRequest {
    User(CreateUserRequest),
    Product(CreateProductRequest),
    Order(CreateOrderRequest),
}

/// Request body of `PUT /api/{resource}/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UpdateResourceRequest {
    User(UpdateUserRequest),
    Product(UpdateProductRequest),
    Order(UpdateOrderRequest),
}
