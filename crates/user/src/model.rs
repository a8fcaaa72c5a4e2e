use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{requests::Address, responses::UserResponse};
use sqlx::{FromRow, types::Json};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub addresses: Json<Vec<Address>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// model to response
impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        UserResponse {
            id: value.user_id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            addresses: value.addresses.0,
            version: value.version,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}
