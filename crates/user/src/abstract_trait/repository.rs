use crate::model::User as UserModel;
use async_trait::async_trait;
use shared::{
    domain::requests::{CreateUserRequest, FindAllRequest, UpdateUserRequest},
    errors::RepositoryError,
};
use std::sync::Arc;

pub type DynUserQueryRepository = Arc<dyn UserQueryRepositoryTrait + Send + Sync>;
pub type DynUserCommandRepository = Arc<dyn UserCommandRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait UserQueryRepositoryTrait {
    async fn find_all(&self, req: &FindAllRequest)
    -> Result<(Vec<UserModel>, i64), RepositoryError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<UserModel>, RepositoryError>;
}

#[async_trait]
pub trait UserCommandRepositoryTrait {
    async fn create_user(&self, req: &CreateUserRequest) -> Result<UserModel, RepositoryError>;

    /// Writes only if the stored row still has `expected_version`; a stale
    /// version yields `RepositoryError::Conflict`.
    async fn update_user(
        &self,
        user_id: i32,
        expected_version: i64,
        req: &UpdateUserRequest,
    ) -> Result<UserModel, RepositoryError>;

    async fn delete_user(&self, user_id: i32) -> Result<(), RepositoryError>;
}
