use crate::errors::{repository::RepositoryError, service::ServiceError};
use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error)]
pub enum AppErrorGrpc {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
    #[error("Unhandled: {0}")]
    Unhandled(String),
}

impl From<AppErrorGrpc> for Status {
    fn from(err: AppErrorGrpc) -> Self {
        match err {
            AppErrorGrpc::Service(service_err) => match service_err {
                ServiceError::Validation(errors) => Status::invalid_argument(errors.join("; ")),

                ServiceError::InvalidTransition(msg) => Status::failed_precondition(msg),

                ServiceError::Repo(repo_err) => match repo_err {
                    RepositoryError::NotFound => Status::not_found("Not found"),
                    RepositoryError::Conflict(msg) => Status::aborted(msg),
                    RepositoryError::AlreadyExists(msg) => Status::already_exists(msg),
                    RepositoryError::Sqlx(_) => Status::internal("Database error"),
                    RepositoryError::Custom(msg) => Status::internal(msg),
                },

                ServiceError::Timeout(target) => {
                    Status::deadline_exceeded(format!("Call to {target} timed out"))
                }

                ServiceError::CircuitOpen(target) => {
                    Status::unavailable(format!("Circuit open for {target}"))
                }

                ServiceError::Unavailable(msg) => Status::unavailable(msg),

                ServiceError::Cancelled(target) => {
                    Status::cancelled(format!("Call to {target} was cancelled"))
                }

                ServiceError::UnknownResource(resource) => {
                    Status::not_found(format!("Unknown resource: {resource}"))
                }

                ServiceError::Internal(msg) => Status::internal(msg),
            },

            AppErrorGrpc::Unhandled(msg) => Status::internal(format!("Unhandled error: {msg}")),
        }
    }
}

impl From<Status> for AppErrorGrpc {
    fn from(status: Status) -> Self {
        let message = status.message().to_string();

        match status.code() {
            tonic::Code::InvalidArgument => {
                let errors = message.split("; ").map(str::to_string).collect();
                AppErrorGrpc::Service(ServiceError::Validation(errors))
            }

            tonic::Code::NotFound => AppErrorGrpc::Service(ServiceError::not_found()),

            tonic::Code::FailedPrecondition => {
                AppErrorGrpc::Service(ServiceError::InvalidTransition(message))
            }

            tonic::Code::Aborted => {
                AppErrorGrpc::Service(ServiceError::Repo(RepositoryError::Conflict(message)))
            }

            tonic::Code::AlreadyExists => {
                AppErrorGrpc::Service(ServiceError::Repo(RepositoryError::AlreadyExists(message)))
            }

            tonic::Code::DeadlineExceeded => AppErrorGrpc::Service(ServiceError::Timeout(message)),

            tonic::Code::Unavailable | tonic::Code::ResourceExhausted => {
                AppErrorGrpc::Service(ServiceError::Unavailable(message))
            }

            tonic::Code::Cancelled => AppErrorGrpc::Service(ServiceError::Cancelled(message)),

            tonic::Code::Internal | tonic::Code::Unknown => {
                AppErrorGrpc::Service(ServiceError::Internal(message))
            }

            _ => AppErrorGrpc::Unhandled(format!("gRPC error: {} - {}", status.code(), message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_errors_survive_the_wire() {
        let status: Status =
            AppErrorGrpc::from(ServiceError::InvalidTransition("cannot fulfill".into())).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let back = crate::errors::grpc_status_to_service_error(status);
        assert!(matches!(back, ServiceError::InvalidTransition(msg) if msg == "cannot fulfill"));
    }

    #[test]
    fn unavailable_status_is_transient() {
        let err = crate::errors::grpc_status_to_service_error(Status::unavailable("conn refused"));
        assert!(err.is_transient());

        let err = crate::errors::grpc_status_to_service_error(Status::not_found("gone"));
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }
}
