mod grpc_client;
mod repository;
mod service;

pub use self::grpc_client::{
    DynPaymentClient, DynProductClient, DynUserClient, PaymentClientTrait, ProductClientTrait,
    UserClientTrait,
};
pub use self::repository::{
    DynOrderCommandRepository, DynOrderQueryRepository, OrderCommandRepositoryTrait,
    OrderQueryRepositoryTrait,
};
pub use self::service::{
    DynOrderCommandService, DynOrderQueryService, OrderCommandServiceTrait,
    OrderQueryServiceTrait,
};
