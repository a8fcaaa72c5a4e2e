mod api;
mod order;
mod pagination;
mod product;
mod user;

pub use self::api::{ApiResponse, ApiResponsePagination};
pub use self::order::{OrderLineResponse, OrderResponse};
pub use self::pagination::Pagination;
pub use self::product::{ProductResponse, ReservationResponse};
pub use self::user::UserResponse;
