use genproto::user::{
    Address as AddressProto, CreateUserRequest as CreateUserRequestProto,
    UpdateUserRequest as UpdateUserRequestProto,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone, PartialEq, Eq)]
pub struct Address {
    #[serde(default)]
    pub label: String,

    #[validate(length(min = 1, message = "line1 must not be empty"))]
    pub line1: String,

    #[serde(default)]
    pub line2: Option<String>,

    #[validate(length(min = 1, message = "city must not be empty"))]
    pub city: String,

    #[serde(default)]
    pub postal_code: String,

    #[validate(length(min = 1, message = "country must not be empty"))]
    pub country: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub addresses: Vec<Address>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema, Clone)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub user_id: Option<i32>,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub addresses: Vec<Address>,
}

impl From<AddressProto> for Address {
    fn from(value: AddressProto) -> Self {
        Self {
            label: value.label,
            line1: value.line1,
            line2: value.line2,
            city: value.city,
            postal_code: value.postal_code,
            country: value.country,
        }
    }
}

impl From<Address> for AddressProto {
    fn from(value: Address) -> Self {
        Self {
            label: value.label,
            line1: value.line1,
            line2: value.line2,
            city: value.city,
            postal_code: value.postal_code,
            country: value.country,
        }
    }
}

impl From<CreateUserRequestProto> for CreateUserRequest {
    fn from(value: CreateUserRequestProto) -> Self {
        Self {
            name: value.name,
            email: value.email,
            phone: value.phone,
            addresses: value.addresses.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<CreateUserRequest> for CreateUserRequestProto {
    fn from(value: CreateUserRequest) -> Self {
        Self {
            name: value.name,
            email: value.email,
            phone: value.phone,
            addresses: value.addresses.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<UpdateUserRequestProto> for UpdateUserRequest {
    fn from(value: UpdateUserRequestProto) -> Self {
        Self {
            user_id: Some(value.id),
            name: value.name,
            email: value.email,
            phone: value.phone,
            addresses: value.addresses.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<UpdateUserRequest> for UpdateUserRequestProto {
    fn from(value: UpdateUserRequest) -> Self {
        Self {
            id: value.user_id.unwrap_or_default(),
            name: value.name,
            email: value.email,
            phone: value.phone,
            addresses: value.addresses.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            label: "home".into(),
            line1: "Jl. Merdeka 1".into(),
            line2: None,
            city: "Bandung".into(),
            postal_code: "40111".into(),
            country: "ID".into(),
        }
    }

    #[test]
    fn rejects_bad_email_and_long_name() {
        let req = CreateUserRequest {
            name: "x".repeat(101),
            email: "not-an-email".into(),
            phone: None,
            addresses: vec![address()],
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn rejects_address_without_city() {
        let mut bad = address();
        bad.city.clear();

        let req = CreateUserRequest {
            name: "Dina".into(),
            email: "dina@example.com".into(),
            phone: None,
            addresses: vec![bad],
        };

        assert!(req.validate().is_err());
    }
}
