//! Bearer sessions. Only the SHA-256 of a token is stored.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::db::Database;
use crate::error::Result;
use crate::models::Session;

pub const SESSION_TTL_DAYS: i64 = 30;

fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl Database {
    pub async fn create_session(&self, user_id: &str, token: &str, now: DateTime<Utc>) -> Result<Session> {
        let session = Session {
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        };
        sqlx::query("INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(token_hash(token))
            .bind(&session.user_id)
            .bind(session.created_at)
            .bind(session.expires_at)
            .execute(self.pool())
            .await?;
        Ok(session)
    }

    /// Unexpired session for `token`
    pub async fn resolve_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT user_id, created_at, expires_at FROM sessions WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(token_hash(token))
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        Ok(session)
    }

    pub async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash(token))
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Drop every session expired at `now`, returning how many went
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(purged.rows_affected())
    }

    pub async fn session_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    async fn db_with_user() -> (Database, String) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .create_user(
                &NewUser {
                    username: "ada".into(),
                    email: "ada@example.com".into(),
                    password_hash: "hash".into(),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (db, user_id) = db_with_user().await;
        let now = Utc::now();
        db.create_session(&user_id, "tok-123", now).await.unwrap();

        let session = db.resolve_session("tok-123", now).await.unwrap().unwrap();
        assert_eq!(session.user_id, user_id);
        assert!(db.resolve_session("tok-other", now).await.unwrap().is_none());

        db.delete_session("tok-123").await.unwrap();
        assert!(db.resolve_session("tok-123", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_does_not_resolve() {
        let (db, user_id) = db_with_user().await;
        let now = Utc::now();
        db.create_session(&user_id, "tok", now).await.unwrap();
        let later = now + Duration::days(SESSION_TTL_DAYS + 1);
        assert!(db.resolve_session("tok", later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired_sessions() {
        let (db, user_id) = db_with_user().await;
        let now = Utc::now();
        db.create_session(&user_id, "tok-old", now - Duration::days(SESSION_TTL_DAYS + 1)).await.unwrap();
        db.create_session(&user_id, "tok-new", now).await.unwrap();

        assert_eq!(db.purge_expired_sessions(now).await.unwrap(), 1);
        assert_eq!(db.session_count().await.unwrap(), 1);
        assert!(db.resolve_session("tok-new", now).await.unwrap().is_some());
        assert_eq!(db.purge_expired_sessions(now).await.unwrap(), 0);
    }

    #[test]
    fn test_token_is_hashed() {
        assert_eq!(token_hash("abc").len(), 64);
        assert_ne!(token_hash("abc"), "abc");
    }
}
