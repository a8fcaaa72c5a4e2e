use crate::{
    abstract_trait::{UserCommandRepositoryTrait, UserQueryRepositoryTrait},
    model::User as UserModel,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use shared::{
    domain::requests::{CreateUserRequest, FindAllRequest, UpdateUserRequest},
    errors::RepositoryError,
};
use sqlx::types::Json;
use std::collections::BTreeMap;

#[derive(Default)]
struct UserTable {
    last_id: i32,
    rows: BTreeMap<i32, UserModel>,
}

impl UserTable {
    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.rows
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.user_id) != except)
    }
}

/// Process-local user store with the same semantics as the Postgres one.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserQueryRepositoryTrait for InMemoryUserRepository {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<(Vec<UserModel>, i64), RepositoryError> {
        let table = self.table.read();
        let needle = req.search.trim().to_lowercase();

        let matching: Vec<&UserModel> = table
            .rows
            .values()
            .rev()
            .filter(|u| {
                needle.is_empty()
                    || u.name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
            })
            .collect();

        let total = matching.len() as i64;
        let offset = ((req.page - 1).max(0) * req.page_size) as usize;

        let page = matching
            .into_iter()
            .skip(offset)
            .take(req.page_size.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<UserModel>, RepositoryError> {
        Ok(self.table.read().rows.get(&id).cloned())
    }
}

#[async_trait]
impl UserCommandRepositoryTrait for InMemoryUserRepository {
    async fn create_user(&self, req: &CreateUserRequest) -> Result<UserModel, RepositoryError> {
        let mut table = self.table.write();

        if table.email_taken(&req.email, None) {
            return Err(RepositoryError::AlreadyExists(format!(
                "email {} is already registered",
                req.email
            )));
        }

        table.last_id += 1;
        let now = Utc::now();
        let user = UserModel {
            user_id: table.last_id,
            name: req.name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            addresses: Json(req.addresses.clone()),
            version: 1,
            created_at: now,
            updated_at: now,
        };

        table.rows.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        user_id: i32,
        expected_version: i64,
        req: &UpdateUserRequest,
    ) -> Result<UserModel, RepositoryError> {
        let mut table = self.table.write();

        if table.email_taken(&req.email, Some(user_id)) {
            return Err(RepositoryError::AlreadyExists(format!(
                "email {} is already registered",
                req.email
            )));
        }

        let user = table
            .rows
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;

        if user.version != expected_version {
            return Err(RepositoryError::Conflict(format!(
                "user {user_id} changed since version {expected_version}"
            )));
        }

        user.name = req.name.clone();
        user.email = req.email.clone();
        user.phone = req.phone.clone();
        user.addresses = Json(req.addresses.clone());
        user.version += 1;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: i32) -> Result<(), RepositoryError> {
        self.table
            .write()
            .rows
            .remove(&user_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.into(),
            email: email.into(),
            phone: None,
            addresses: vec![],
        }
    }

    fn update(name: &str, email: &str) -> UpdateUserRequest {
        UpdateUserRequest {
            user_id: None,
            name: name.into(),
            email: email.into(),
            phone: None,
            addresses: vec![],
        }
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create_user(&create("Ana", "ana@example.com")).await.unwrap();

        let updated = repo
            .update_user(user.user_id, user.version, &update("Ana B", "ana@example.com"))
            .await
            .unwrap();
        assert_eq!(updated.version, user.version + 1);

        let stale = repo
            .update_user(user.user_id, user.version, &update("Ana C", "ana@example.com"))
            .await;
        assert!(matches!(stale, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&create("Ana", "ana@example.com")).await.unwrap();

        let err = repo
            .create_user(&create("Other", "ANA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn search_and_pagination() {
        let repo = InMemoryUserRepository::new();
        for i in 0..5 {
            repo.create_user(&create(&format!("user{i}"), &format!("u{i}@example.com")))
                .await
                .unwrap();
        }
        repo.create_user(&create("Budi", "budi@example.com")).await.unwrap();

        let page = FindAllRequest {
            page: 2,
            page_size: 2,
            search: "user".into(),
        };
        let (users, total) = repo.find_all(&page).await.unwrap();

        assert_eq!(total, 5);
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "user2");
    }
}
