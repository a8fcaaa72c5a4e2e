mod repository;
mod service;

pub use self::repository::{
    DynProductCommandRepository, DynProductQueryRepository, DynStockRepository,
    ProductCommandRepositoryTrait, ProductQueryRepositoryTrait, StockRepositoryTrait,
};
pub use self::service::{
    DynProductCommandService, DynProductQueryService, ProductCommandServiceTrait,
    ProductQueryServiceTrait,
};
