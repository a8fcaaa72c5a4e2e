mod memory;
mod postgres;
mod stock;

pub use self::memory::InMemoryProductRepository;
pub use self::postgres::{ProductCommandRepository, ProductQueryRepository};
pub use self::stock::StockRepository;
