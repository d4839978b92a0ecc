//! PostgreSQL store
//!
//! Expects the `users` and `sessions` tables to exist; schema and migrations
//! are owned by the application.
//!
//! ```sql
//! users    (id BIGSERIAL, username TEXT UNIQUE, email TEXT UNIQUE,
//!           hashed_password TEXT, password_changed_at TIMESTAMPTZ,
//!           created_at TIMESTAMPTZ)
//! sessions (id UUID PRIMARY KEY, user_id BIGINT, username TEXT,
//!           refresh_token TEXT, user_agent TEXT, client_ip TEXT,
//!           is_revoked BOOLEAN DEFAULT false, expires_at TIMESTAMPTZ,
//!           created_at TIMESTAMPTZ DEFAULT NOW())
//! ```

use super::{SessionStore, StoreError, UserStore};
use crate::models::{NewSession, NewUser, Session, User};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Users and sessions in PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.db
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return StoreError::Duplicate(constraint.to_string());
            }
        }
        tracing::error!("Database error: {:?}", err);
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, password_changed_at, created_at
            FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, hashed_password, password_changed_at, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, username, refresh_token, user_agent, client_ip, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, username, refresh_token, user_agent, client_ip,
                      is_revoked, expires_at, created_at
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.username)
        .bind(&session.refresh_token)
        .bind(&session.user_agent)
        .bind(&session.client_ip)
        .bind(session.expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, username, refresh_token, user_agent, client_ip,
                   is_revoked, expires_at, created_at
            FROM sessions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    async fn revoke_session(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE sessions SET is_revoked = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_backend() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Backend(_)
        ));
    }
}
