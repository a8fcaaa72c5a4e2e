use crate::errors::{
    error::ErrorResponse, grpc::AppErrorGrpc, repository::RepositoryError, service::ServiceError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    GatewayTimeout(String),
    Internal(String),
}

impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => {
                HttpError::BadRequest(format!("Validation failed: {}", errors.join("; ")))
            }

            ServiceError::InvalidTransition(msg) => HttpError::Conflict(msg),

            ServiceError::Repo(repo_err) => match repo_err {
                RepositoryError::NotFound => HttpError::NotFound("Not found".into()),
                RepositoryError::Conflict(msg) => HttpError::Conflict(msg),
                RepositoryError::AlreadyExists(msg) => HttpError::Conflict(msg),
                _ => HttpError::Internal("Repository error".into()),
            },

            ServiceError::UnknownResource(resource) => {
                HttpError::NotFound(format!("Unknown resource: {resource}"))
            }

            ServiceError::Timeout(target) => {
                HttpError::GatewayTimeout(format!("Upstream {target} timed out"))
            }

            ServiceError::CircuitOpen(target) => {
                HttpError::ServiceUnavailable(format!("Upstream {target} is unavailable"))
            }

            ServiceError::Unavailable(msg) => HttpError::ServiceUnavailable(msg),

            ServiceError::Cancelled(target) => {
                HttpError::ServiceUnavailable(format!("Call to {target} was cancelled"))
            }

            ServiceError::Internal(msg) => HttpError::Internal(msg),
        }
    }
}

impl From<AppErrorGrpc> for HttpError {
    fn from(err: AppErrorGrpc) -> Self {
        match err {
            AppErrorGrpc::Service(service_err) => service_err.into(),
            AppErrorGrpc::Unhandled(msg) => HttpError::Internal(msg),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            HttpError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            HttpError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse::new(msg))).into_response()
    }
}
