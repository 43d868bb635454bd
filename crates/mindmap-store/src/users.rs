//! User accounts

use chrono::{DateTime, Utc};
use mindmap_payments::trial_end;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, registered_at, trial_ends_at, customer_id, subscription_id";

impl Database {
    /// Register a user; the trial starts now
    pub async fn create_user(&self, new: &NewUser, now: DateTime<Utc>) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new.username.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            registered_at: now,
            trial_ends_at: trial_end(now),
            customer_id: None,
            subscription_id: None,
        };

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, registered_at, trial_ends_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.registered_at)
        .bind(user.trial_ends_at)
        .execute(self.pool())
        .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_customer(&self, customer_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE customer_id = ?"))
            .bind(customer_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn set_customer_id(&self, user_id: &str, customer_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET customer_id = ? WHERE id = ?")
            .bind(customer_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn set_current_subscription(&self, user_id: &str, subscription_id: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE users SET subscription_id = ? WHERE id = ?")
            .bind(subscription_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$stub".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::in_memory().await.unwrap();
        let now = Utc::now();
        let user = db.create_user(&new_user("ada"), now).await.unwrap();

        assert_eq!(user.trial_ends_at - user.registered_at, Duration::days(14));
        let by_name = db.get_user_by_username("ada").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_name.trial_ends_at, user.trial_ends_at);
        assert!(db.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let db = Database::in_memory().await.unwrap();
        db.create_user(&new_user("ada"), Utc::now()).await.unwrap();
        let err = db.create_user(&new_user("ada"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_customer_link() {
        let db = Database::in_memory().await.unwrap();
        let user = db.create_user(&new_user("ada"), Utc::now()).await.unwrap();

        db.set_customer_id(&user.id, "cus_1").await.unwrap();
        db.set_current_subscription(&user.id, Some("sub_1")).await.unwrap();

        let found = db.get_user_by_customer("cus_1").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.subscription_id.as_deref(), Some("sub_1"));
        assert!(matches!(
            db.set_customer_id("missing", "cus_2").await,
            Err(StoreError::NotFound)
        ));
    }
}
