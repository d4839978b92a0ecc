//! Token Makers
//!
//! Issues and verifies the tokens carried by API clients. Two schemes share
//! one contract:
//! - [`PasetoMaker`] - authenticated encryption, payload opaque without the key
//! - [`JwtMaker`] - HS256 signed claims, payload readable but tamper-evident
//!
//! The scheme is picked once, from [`TokenKind`], when the maker is built.

mod jwt;
mod paseto;

pub use jwt::JwtMaker;
pub use paseto::PasetoMaker;

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Shortest symmetric key accepted by any maker, in bytes
pub const MIN_SECRET_KEY_LENGTH: usize = 32;

/// Token errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Secret key must be at least {min} bytes, got {actual}")]
    WeakKey { min: usize, actual: usize },

    #[error("Unusable secret key: {0}")]
    Key(String),

    #[error("Token duration must be positive")]
    InvalidDuration,

    #[error("Token is invalid")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,
}

/// Claims carried inside every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Unique token id; also the id of the session a refresh token belongs to
    pub id: Uuid,
    pub user_id: i64,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Payload {
    /// Build a payload valid from `now` for `duration`
    ///
    /// Fails with [`TokenError::InvalidDuration`] when `duration` is not
    /// positive or `now + duration` is past the representable range.
    pub fn new(
        user_id: i64,
        username: impl Into<String>,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        if duration <= Duration::zero() {
            return Err(TokenError::InvalidDuration);
        }
        let expires_at = now
            .checked_add_signed(duration)
            .ok_or(TokenError::InvalidDuration)?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            username: username.into(),
            issued_at: now,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Reject a payload whose validity window has closed
    pub fn check_expiry(&self, now: DateTime<Utc>) -> Result<(), TokenError> {
        if self.is_expired(now) {
            return Err(TokenError::ExpiredToken);
        }
        Ok(())
    }
}

/// Issues and verifies tokens for one scheme and one key
pub trait TokenMaker: Send + Sync {
    /// Mint a token for the user, valid for `duration`
    fn create_token(
        &self,
        user_id: i64,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError>;

    /// Authenticate a token and return its payload
    ///
    /// Forged, malformed or foreign-algorithm tokens fail with
    /// [`TokenError::InvalidToken`]; authentic tokens past their expiry fail
    /// with [`TokenError::ExpiredToken`].
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError>;
}

/// Token scheme selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Paseto,
    Jwt,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Paseto => "paseto",
            TokenKind::Jwt => "jwt",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paseto" => Ok(TokenKind::Paseto),
            "jwt" => Ok(TokenKind::Jwt),
            other => Err(format!("unknown token kind '{other}'")),
        }
    }
}

/// Build the maker for `kind`
pub fn build_maker(
    kind: TokenKind,
    secret_key: &str,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn TokenMaker>, TokenError> {
    let maker: Arc<dyn TokenMaker> = match kind {
        TokenKind::Paseto => Arc::new(PasetoMaker::with_clock(secret_key, clock)?),
        TokenKind::Jwt => Arc::new(JwtMaker::with_clock(secret_key, clock)?),
    };
    Ok(maker)
}

pub(crate) fn check_key_length(secret_key: &str) -> Result<(), TokenError> {
    if secret_key.len() < MIN_SECRET_KEY_LENGTH {
        return Err(TokenError::WeakKey {
            min: MIN_SECRET_KEY_LENGTH,
            actual: secret_key.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use tokio_test::{assert_err, assert_ok};

    const KEY: &str = "0123456789abcdef0123456789abcdef";
    const OTHER_KEY: &str = "fedcba9876543210fedcba9876543210";

    fn makers(key: &str, clock: Arc<dyn Clock>) -> Vec<(TokenKind, Arc<dyn TokenMaker>)> {
        [TokenKind::Paseto, TokenKind::Jwt]
            .into_iter()
            .map(|kind| (kind, assert_ok!(build_maker(kind, key, clock.clone()))))
            .collect()
    }

    #[test]
    fn test_payload_rejects_non_positive_duration() {
        let now = Utc::now();
        assert_eq!(
            Payload::new(1, "alice", Duration::zero(), now),
            Err(TokenError::InvalidDuration)
        );
        assert_eq!(
            Payload::new(1, "alice", Duration::seconds(-5), now),
            Err(TokenError::InvalidDuration)
        );
    }

    #[test]
    fn test_payload_rejects_unrepresentable_expiry() {
        let now = Utc::now();
        assert_eq!(
            Payload::new(1, "alice", Duration::days(365 * 300_000), now),
            Err(TokenError::InvalidDuration)
        );
    }

    #[test]
    fn test_payload_expiry_boundary() {
        let now = Utc::now();
        let payload = assert_ok!(Payload::new(1, "alice", Duration::minutes(1), now));

        assert!(!payload.is_expired(now));
        assert!(payload.is_expired(payload.expires_at));
        assert_eq!(
            payload.check_expiry(payload.expires_at + Duration::seconds(1)),
            Err(TokenError::ExpiredToken)
        );
    }

    #[test]
    fn test_payload_ids_are_unique() {
        let now = Utc::now();
        let a = assert_ok!(Payload::new(1, "alice", Duration::minutes(1), now));
        let b = assert_ok!(Payload::new(1, "alice", Duration::minutes(1), now));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_create_then_verify() {
        for (kind, maker) in makers(KEY, Arc::new(SystemClock)) {
            let duration = Duration::minutes(15);
            let (token, issued) = assert_ok!(maker.create_token(42, "alice", duration));
            let verified = assert_ok!(maker.verify_token(&token));

            assert_eq!(verified, issued, "{kind}");
            assert_eq!(verified.user_id, 42);
            assert_eq!(verified.username, "alice");
            assert_eq!(verified.expires_at - verified.issued_at, duration);
        }
    }

    #[test]
    fn test_expired_token_reports_expired() {
        let clock = Arc::new(ManualClock::default());
        for (kind, maker) in makers(KEY, clock.clone()) {
            let (token, _) = assert_ok!(maker.create_token(1, "alice", Duration::minutes(1)));

            clock.advance(Duration::minutes(2));
            let err = assert_err!(maker.verify_token(&token));
            assert_eq!(err, TokenError::ExpiredToken, "{kind}");
        }
    }

    #[test]
    fn test_foreign_key_reports_invalid() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ours = makers(KEY, clock.clone());
        let theirs = makers(OTHER_KEY, clock);

        for ((kind, ours), (_, theirs)) in ours.into_iter().zip(theirs) {
            let (token, _) = assert_ok!(theirs.create_token(1, "alice", Duration::minutes(1)));
            let err = assert_err!(ours.verify_token(&token));
            assert_eq!(err, TokenError::InvalidToken, "{kind}");
        }
    }

    #[test]
    fn test_expired_foreign_token_reports_invalid() {
        let clock = Arc::new(ManualClock::default());
        let ours = makers(KEY, clock.clone());
        let theirs = makers(OTHER_KEY, clock.clone());

        for ((kind, ours), (_, theirs)) in ours.into_iter().zip(theirs) {
            let (token, _) = assert_ok!(theirs.create_token(1, "alice", Duration::minutes(1)));
            clock.advance(Duration::minutes(2));

            let err = assert_err!(ours.verify_token(&token));
            assert_eq!(err, TokenError::InvalidToken, "{kind}");
        }
    }

    #[test]
    fn test_schemes_do_not_accept_each_other() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let paseto = assert_ok!(build_maker(TokenKind::Paseto, KEY, clock.clone()));
        let jwt = assert_ok!(build_maker(TokenKind::Jwt, KEY, clock));

        let (paseto_token, _) = assert_ok!(paseto.create_token(1, "alice", Duration::minutes(1)));
        let (jwt_token, _) = assert_ok!(jwt.create_token(1, "alice", Duration::minutes(1)));

        assert_eq!(jwt.verify_token(&paseto_token), Err(TokenError::InvalidToken));
        assert_eq!(paseto.verify_token(&jwt_token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_garbage_reports_invalid() {
        for (kind, maker) in makers(KEY, Arc::new(SystemClock)) {
            for garbage in ["", "abc", "a.b.c", "v2.local.", "v2.local.!!!"] {
                assert_eq!(
                    maker.verify_token(garbage),
                    Err(TokenError::InvalidToken),
                    "{kind}: {garbage:?}"
                );
            }
        }
    }

    #[test]
    fn test_short_key_rejected() {
        for kind in [TokenKind::Paseto, TokenKind::Jwt] {
            let err = build_maker(kind, "too-short", Arc::new(SystemClock)).err();
            assert_eq!(err, Some(TokenError::WeakKey { min: 32, actual: 9 }));
        }
    }

    #[test]
    fn test_create_rejects_non_positive_duration() {
        for (_, maker) in makers(KEY, Arc::new(SystemClock)) {
            let err = assert_err!(maker.create_token(1, "alice", Duration::zero()));
            assert_eq!(err, TokenError::InvalidDuration);

            let err = assert_err!(maker.create_token(1, "alice", Duration::days(365 * 300_000)));
            assert_eq!(err, TokenError::InvalidDuration);
        }
    }

    #[test]
    fn test_token_kind_parse() {
        assert_eq!("PASETO".parse::<TokenKind>(), Ok(TokenKind::Paseto));
        assert_eq!(" jwt ".parse::<TokenKind>(), Ok(TokenKind::Jwt));
        assert!("basic".parse::<TokenKind>().is_err());
    }
}
