use crate::domain::requests::Address;
use genproto::user::UserResponse as UserResponseProto;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub addresses: Vec<Address>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

// proto to response
impl From<UserResponseProto> for UserResponse {
    fn from(value: UserResponseProto) -> Self {
        UserResponse {
            id: value.id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            addresses: value.addresses.into_iter().map(Into::into).collect(),
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

// response to proto
impl From<UserResponse> for UserResponseProto {
    fn from(value: UserResponse) -> Self {
        UserResponseProto {
            id: value.id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            addresses: value.addresses.into_iter().map(Into::into).collect(),
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
