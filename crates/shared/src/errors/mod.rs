mod error;
mod grpc;
mod http;
mod repository;
mod service;

pub use self::error::ErrorResponse;
pub use self::grpc::AppErrorGrpc;
pub use self::http::HttpError;
pub use self::repository::RepositoryError;
pub use self::service::ServiceError;

use tonic::Status;

/// Client side of a gRPC call: turns the peer's status back into the
/// `ServiceError` it was encoded from.
pub fn grpc_status_to_service_error(status: Status) -> ServiceError {
    match AppErrorGrpc::from(status) {
        AppErrorGrpc::Service(err) => err,
        AppErrorGrpc::Unhandled(msg) => ServiceError::Internal(msg),
    }
}
