use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::errors::{HttpError, ServiceError};
use validator::Validate;

/// JSON body that has already passed its `validator` rules.
pub struct SimpleValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for SimpleValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| HttpError::BadRequest(rejection.body_text()))?;

        value.validate().map_err(ServiceError::from)?;

        Ok(Self(value))
    }
}

/// Untyped JSON body for routes whose shape depends on the resource. Parse it
/// with [`parse_validated`] once the owning service is known.
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| HttpError::BadRequest(rejection.body_text()))?;

        Ok(Self(value))
    }
}

pub fn parse_validated<T>(body: Value) -> Result<T, ServiceError>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_value(body)
        .map_err(|e| ServiceError::validation(format!("body: {e}")))?;

    value.validate()?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::domain::requests::{CreateProductRequest, CreateUserRequest};

    #[test]
    fn reports_every_failing_field() {
        let err = parse_validated::<CreateUserRequest>(json!({
            "name": "",
            "email": "nope",
        }))
        .unwrap_err();

        let ServiceError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert!(messages.iter().any(|m| m.starts_with("name")));
        assert!(messages.iter().any(|m| m.starts_with("email")));
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = parse_validated::<CreateProductRequest>(json!({ "name": 12 })).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
