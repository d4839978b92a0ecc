//! Persistence Collaborators
//!
//! The service reaches users and sessions only through [`UserStore`] and
//! [`SessionStore`]. Each call touches a single row; implementations must make
//! that one create, read or flag update atomic, nothing more.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{NewSession, NewUser, Session, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the username or email is taken
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

/// Refresh session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError>;

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    /// Set `is_revoked`; returns whether the session existed
    async fn revoke_session(&self, id: Uuid) -> Result<bool, StoreError>;
}
