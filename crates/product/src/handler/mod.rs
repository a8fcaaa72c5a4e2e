mod command;
mod query;

pub use self::command::ProductCommandGrpcServiceImpl;
pub use self::query::ProductQueryGrpcServiceImpl;
