mod memory;
mod postgres;

pub use self::memory::InMemoryOrderRepository;
pub use self::postgres::{OrderCommandRepository, OrderQueryRepository};
