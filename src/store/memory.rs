//! In-process store

use super::{SessionStore, StoreError, UserStore};
use crate::models::{NewSession, NewUser, Session, User};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Users {
    next_id: i64,
    by_username: HashMap<String, User>,
}

/// Users and sessions held in memory
///
/// Enforces the same uniqueness rules as the database schema: usernames and
/// emails are unique, session ids are unique.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Users>,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a session row as-is
    pub async fn put_session(&self, session: Session) {
        self.sessions.write().await.insert(session.id, session);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.by_username.get(username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.by_username.contains_key(&user.username) {
            return Err(StoreError::Duplicate(format!("username '{}'", user.username)));
        }
        if users.by_username.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email '{}'", user.email)));
        }

        users.next_id += 1;
        let now = Utc::now();
        let created = User {
            id: users.next_id,
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            password_changed_at: now,
            created_at: now,
        };
        users
            .by_username
            .insert(created.username.clone(), created.clone());

        Ok(created)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(&session.id) {
            return Err(StoreError::Duplicate(format!("session '{}'", session.id)));
        }

        let created = Session {
            id: session.id,
            user_id: session.user_id,
            username: session.username,
            refresh_token: session.refresh_token,
            user_agent: session.user_agent,
            client_ip: session.client_ip,
            is_revoked: false,
            expires_at: session.expires_at,
            created_at: Utc::now(),
        };
        sessions.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn revoke_session(&self, id: Uuid) -> Result<bool, StoreError> {
        match self.sessions.write().await.get_mut(&id) {
            Some(session) => {
                session.is_revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
