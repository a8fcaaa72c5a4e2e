mod command;
mod query;

pub use self::command::{UserCommandService, UserCommandServiceDeps};
pub use self::query::UserQueryService;
