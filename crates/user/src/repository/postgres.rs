use crate::{
    abstract_trait::{UserCommandRepositoryTrait, UserQueryRepositoryTrait},
    model::User as UserModel,
};
use async_trait::async_trait;
use shared::{
    config::ConnectionPool,
    domain::requests::{CreateUserRequest, FindAllRequest, UpdateUserRequest},
    errors::RepositoryError,
};
use sqlx::{FromRow, types::Json};
use tracing::{error, info};

const USER_COLUMNS: &str =
    "user_id, name, email, phone, addresses, version, created_at, updated_at";

#[derive(FromRow)]
struct UserPageRow {
    #[sqlx(flatten)]
    user: UserModel,
    total_count: i64,
}

#[derive(Clone)]
pub struct UserQueryRepository {
    db: ConnectionPool,
}

impl UserQueryRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserQueryRepositoryTrait for UserQueryRepository {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<(Vec<UserModel>, i64), RepositoryError> {
        info!("🔍 Fetching users with search: {:?}", req.search);

        let limit = req.page_size as i64;
        let offset = ((req.page - 1).max(0) * req.page_size) as i64;

        let search_pattern = if req.search.trim().is_empty() {
            None
        } else {
            Some(req.search.trim())
        };

        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}, COUNT(*) OVER() AS total_count
            FROM users
            WHERE (
                $1::TEXT IS NULL OR
                name ILIKE '%' || $1 || '%' OR
                email ILIKE '%' || $1 || '%'
            )
            ORDER BY user_id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, UserPageRow>(&sql)
            .bind(search_pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch users: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        let total = rows.first().map(|r| r.total_count).unwrap_or(0);
        let users = rows.into_iter().map(|r| r.user).collect();

        Ok((users, total))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<UserModel>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");

        sqlx::query_as::<_, UserModel>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch user {id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })
    }
}

#[derive(Clone)]
pub struct UserCommandRepository {
    db: ConnectionPool,
}

impl UserCommandRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserCommandRepositoryTrait for UserCommandRepository {
    async fn create_user(&self, req: &CreateUserRequest) -> Result<UserModel, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, phone, addresses)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, UserModel>(&sql)
            .bind(&req.name)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(Json(&req.addresses))
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to create user {}: {:?}", req.email, e);
                RepositoryError::from_sqlx(e)
            })?;

        info!("✅ Created user id={}", user.user_id);
        Ok(user)
    }

    async fn update_user(
        &self,
        user_id: i32,
        expected_version: i64,
        req: &UpdateUserRequest,
    ) -> Result<UserModel, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $3, email = $4, phone = $5, addresses = $6,
                version = version + 1, updated_at = now()
            WHERE user_id = $1 AND version = $2
            RETURNING {USER_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, UserModel>(&sql)
            .bind(user_id)
            .bind(expected_version)
            .bind(&req.name)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(Json(&req.addresses))
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to update user {user_id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        if let Some(user) = updated {
            return Ok(user);
        }

        let exists: Option<i32> = sqlx::query_scalar("SELECT user_id FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        match exists {
            Some(_) => Err(RepositoryError::Conflict(format!(
                "user {user_id} changed since version {expected_version}"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete_user(&self, user_id: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to delete user {user_id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        info!("🗑️ Deleted user id={user_id}");
        Ok(())
    }
}
