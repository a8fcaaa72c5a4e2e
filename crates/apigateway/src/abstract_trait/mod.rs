mod order;
mod product;
mod user;

pub use self::order::{DynOrderGrpcClient, OrderGrpcClientTrait};
pub use self::product::{DynProductGrpcClient, ProductGrpcClientTrait};
pub use self::user::{DynUserGrpcClient, UserGrpcClientTrait};
