//! Authentication Service
//!
//! Sign-up, sign-in and access token renewal.
//!
//! Every successful sign-up or sign-in mints an access/refresh token pair and
//! persists one session whose id is the refresh token's payload id. Renewal
//! verifies the refresh token, loads that session, and issues a new access
//! token only; the refresh token and session are left as they are.

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, SessionRejection};
use crate::extractors::ClientInfo;
use crate::middleware::AuthGate;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::store::{SessionStore, StoreError, UserStore};
use crate::token::{build_maker, Payload, TokenMaker};

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use validator::Validate;

const ABSENT_USER_PASSWORD: &str = "rustpress-token-auth:absent-user";

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    tokens: Arc<dyn TokenMaker>,
    hasher: PasswordHasher,
    /// Verified against when the username is unknown, so both sign-in
    /// failures cost one Argon2 run
    absent_user_hash: String,
    clock: Arc<dyn Clock>,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl AuthService {
    /// Create a new authentication service
    ///
    /// Fails if the configuration is invalid or the token key is unusable.
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, AuthError> {
        Self::with_clock(config, users, sessions, Arc::new(SystemClock))
    }

    /// Create a service that reads time from `clock`
    pub fn with_clock(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let tokens = build_maker(config.token_kind, &config.token_symmetric_key, clock.clone())?;
        let hasher = PasswordHasher::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
        )
        .map_err(|e| AuthError::Config(e.to_string()))?;
        let absent_user_hash = hasher
            .hash(ABSENT_USER_PASSWORD)
            .map_err(|e| AuthError::Config(e.to_string()))?;

        tracing::info!(token_kind = %config.token_kind, "Authentication service ready");

        Ok(Self {
            users,
            sessions,
            tokens,
            hasher,
            absent_user_hash,
            clock,
            access_token_duration: config.access_duration()?,
            refresh_token_duration: config.refresh_duration()?,
        })
    }

    /// Gate sharing this service's token maker
    pub fn gate(&self) -> AuthGate {
        AuthGate::new(self.tokens.clone())
    }

    pub fn token_maker(&self) -> Arc<dyn TokenMaker> {
        self.tokens.clone()
    }

    // ============================================
    // Sign-up / Sign-in
    // ============================================

    /// Register a user and open their first session
    pub async fn sign_up(
        &self,
        req: SignUpRequest,
        client: ClientInfo,
    ) -> Result<AuthResponse, AuthError> {
        req.validate()?;

        let hashed_password = self.hash_password(req.password).await?;

        let user = self
            .users
            .create_user(NewUser {
                username: req.username,
                email: req.email,
                hashed_password,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(what) => AuthError::DuplicateUser(what),
                other => AuthError::Storage(other),
            })?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        self.open_session(user, client).await
    }

    /// Check credentials and open a session
    pub async fn sign_in(
        &self,
        req: SignInRequest,
        client: ClientInfo,
    ) -> Result<AuthResponse, AuthError> {
        req.validate()?;

        let Some(user) = self.users.find_user_by_username(&req.username).await? else {
            self.verify_password(req.password, self.absent_user_hash.clone())
                .await?;
            return Err(AuthError::UserNotFound);
        };

        if !self
            .verify_password(req.password, user.hashed_password.clone())
            .await?
        {
            tracing::info!(user_id = user.id, "Sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(user, client).await
    }

    async fn open_session(&self, user: User, client: ClientInfo) -> Result<AuthResponse, AuthError> {
        let (access_token, access_payload) =
            self.tokens
                .create_token(user.id, &user.username, self.access_token_duration)?;
        let (refresh_token, refresh_payload) =
            self.tokens
                .create_token(user.id, &user.username, self.refresh_token_duration)?;

        let session = self
            .sessions
            .create_session(NewSession {
                id: refresh_payload.id,
                user_id: user.id,
                username: user.username.clone(),
                refresh_token: refresh_token.clone(),
                user_agent: client.user_agent,
                client_ip: client.ip,
                expires_at: refresh_payload.expires_at,
            })
            .await?;

        tracing::info!(user_id = user.id, session_id = %session.id, "Session opened");

        Ok(AuthResponse {
            session_id: session.id,
            access_token,
            access_token_expires_at: access_payload.expires_at,
            refresh_token,
            refresh_token_expires_at: refresh_payload.expires_at,
            user: user.into(),
        })
    }

    // ============================================
    // Token Management
    // ============================================

    /// Exchange a refresh token for a new access token
    pub async fn refresh_access_token(
        &self,
        req: RefreshTokenRequest,
    ) -> Result<RefreshResponse, AuthError> {
        req.validate()?;

        let (payload, session) = self.load_session(&req.refresh_token).await?;

        if let Err(reason) = check_session(&session, &payload, &req.refresh_token, self.clock.now()) {
            tracing::warn!(
                session_id = %session.id,
                user_id = payload.user_id,
                reason = %reason,
                "Refresh rejected"
            );
            return Err(AuthError::Unauthorized(reason));
        }

        let (access_token, access_payload) =
            self.tokens
                .create_token(payload.user_id, &payload.username, self.access_token_duration)?;

        tracing::info!(user_id = payload.user_id, session_id = %session.id, "Access token renewed");

        Ok(RefreshResponse {
            access_token,
            access_token_expires_at: access_payload.expires_at,
        })
    }

    /// Revoke the session behind a refresh token (logout)
    ///
    /// Revoking an already revoked session succeeds.
    pub async fn revoke_session(&self, req: RefreshTokenRequest) -> Result<(), AuthError> {
        req.validate()?;

        let (payload, session) = self.load_session(&req.refresh_token).await?;

        if session.user_id != payload.user_id || session.username != payload.username {
            return Err(AuthError::Unauthorized(SessionRejection::IdentityMismatch));
        }
        if session.refresh_token != req.refresh_token {
            return Err(AuthError::Unauthorized(SessionRejection::StaleToken));
        }

        if !self.sessions.revoke_session(session.id).await? {
            return Err(AuthError::SessionNotFound);
        }

        tracing::info!(user_id = payload.user_id, session_id = %session.id, "Session revoked");
        Ok(())
    }

    async fn load_session(&self, refresh_token: &str) -> Result<(Payload, Session), AuthError> {
        let payload = self.tokens.verify_token(refresh_token).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            AuthError::Token(e)
        })?;

        let session = self
            .sessions
            .find_session(payload.id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        Ok((payload, session))
    }

    // ============================================
    // Password Hashing
    // ============================================

    // Argon2 runs on the blocking pool, never on the async workers.

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await??;
        Ok(ok)
    }
}

/// Session checks for a refresh, in order; the first failure wins
pub fn check_session(
    session: &Session,
    payload: &Payload,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<(), SessionRejection> {
    if session.is_revoked {
        return Err(SessionRejection::Revoked);
    }
    if session.user_id != payload.user_id || session.username != payload.username {
        return Err(SessionRejection::IdentityMismatch);
    }
    if session.refresh_token != refresh_token {
        return Err(SessionRejection::StaleToken);
    }
    if session.is_expired(now) {
        return Err(SessionRejection::Expired);
    }
    Ok(())
}
