mod command;
mod query;

pub use self::command::UserCommandGrpcServiceImpl;
pub use self::query::UserQueryGrpcServiceImpl;
