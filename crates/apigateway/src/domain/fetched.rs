use shared::domain::responses::ApiResponse;

/// A single-entity read, either fresh from the owning service or replayed
/// from the gateway's cache while that service is unreachable.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub response: ApiResponse<T>,
    pub stale: bool,
}

impl<T> Fetched<T> {
    pub fn fresh(response: ApiResponse<T>) -> Self {
        Self {
            response,
            stale: false,
        }
    }

    pub fn stale(response: ApiResponse<T>) -> Self {
        Self {
            response,
            stale: true,
        }
    }
}
