use anyhow::{Result, anyhow};
use chrono::Utc;
use surrealdb::sql::Datetime;
use tracing::error;

use crate::db::{Db, UserRecord};
use crate::types::UserId;

/// Store for application user records.
#[derive(Clone)]
pub struct UserDirectory {
    db: Db,
}

impl UserDirectory {
    /// Create a new user directory.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Look up a user by external principal id. First match wins.
    pub async fn get_user_details(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM app_user WHERE user_id = $user_id LIMIT 1")
            .bind(("user_id", user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Create a user record, or refresh its name when it changed.
    ///
    /// Failures are logged and swallowed; callers get `None` instead of an
    /// error so a broken user record never blocks the conversation flow.
    pub async fn create_or_update_user(
        &self,
        user_id: &UserId,
        name: &str,
        role: &str,
    ) -> Option<UserRecord> {
        match self.try_create_or_update(user_id, name, role).await {
            Ok(user) => Some(user),
            Err(e) => {
                error!(user_id = %user_id, "failed to create or update user: {:#}", e);
                None
            }
        }
    }

    async fn try_create_or_update(
        &self,
        user_id: &UserId,
        name: &str,
        role: &str,
    ) -> Result<UserRecord> {
        if let Some(existing) = self.get_user_details(user_id).await? {
            // Update only if the name changed.
            if existing.name == name {
                return Ok(existing);
            }

            let mut res = self
                .db
                .query("UPDATE app_user SET name = $name WHERE user_id = $user_id")
                .bind(("name", name.to_string()))
                .bind(("user_id", user_id.clone()))
                .await?;

            let updated: Vec<UserRecord> = res.take(0)?;
            return updated
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("no response from user update"));
        }

        let now = Datetime::from(Utc::now());
        let mut res = self
            .db
            .query(
                r#"
                CREATE app_user CONTENT {
                    user_id: $user_id,
                    name: $name,
                    role: $role,
                    created_at: $now
                }
                "#,
            )
            .bind(("user_id", user_id.clone()))
            .bind(("name", name.to_string()))
            .bind(("role", role.to_string()))
            .bind(("now", now))
            .await?;

        let created: Option<UserRecord> = res.take(0)?;
        created.ok_or_else(|| anyhow!("no response from user create"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};

    async fn setup_directory() -> UserDirectory {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        UserDirectory::new(db)
    }

    #[tokio::test]
    async fn test_create_or_update_user_creates_new() {
        let directory = setup_directory().await;
        let user_id = UserId::new("principal-1");

        let user = directory
            .create_or_update_user(&user_id, "Sample User", "member")
            .await
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.name, "Sample User");
        assert_eq!(user.role, "member");
    }

    #[tokio::test]
    async fn test_create_or_update_user_is_stable_when_name_unchanged() {
        let directory = setup_directory().await;
        let user_id = UserId::new("principal-1");

        let first = directory
            .create_or_update_user(&user_id, "Sample User", "member")
            .await
            .unwrap();
        let second = directory
            .create_or_update_user(&user_id, "Sample User", "member")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_create_or_update_user_refreshes_changed_name() {
        let directory = setup_directory().await;
        let user_id = UserId::new("principal-1");

        let first = directory
            .create_or_update_user(&user_id, "Old Name", "member")
            .await
            .unwrap();
        let renamed = directory
            .create_or_update_user(&user_id, "New Name", "member")
            .await
            .unwrap();

        assert_eq!(first.id, renamed.id);
        assert_eq!(renamed.name, "New Name");

        let fetched = directory
            .get_user_details(&user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "New Name");
    }

    #[tokio::test]
    async fn test_get_user_details_missing_is_none() {
        let directory = setup_directory().await;
        let missing = directory
            .get_user_details(&UserId::new("nobody"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
