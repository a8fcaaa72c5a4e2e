mod memory;
mod postgres;

pub use self::memory::InMemoryUserRepository;
pub use self::postgres::{UserCommandRepository, UserQueryRepository};
