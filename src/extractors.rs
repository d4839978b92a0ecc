//! Authentication Extractors
//!
//! Axum extractors for the verified token payload and request metadata.

use crate::error::AuthError;
use crate::token::Payload;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Payload attached by [`require_auth`](crate::middleware::require_auth)
///
/// Handlers behind the gate take this to learn who is calling; ownership
/// checks against `payload.user_id` are theirs to make.
#[derive(Debug, Clone)]
pub struct AuthPayload(pub Payload);

#[async_trait]
impl<S> FromRequestParts<S> for AuthPayload
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Payload>()
            .cloned()
            .map(AuthPayload)
            .ok_or(AuthError::MissingCredential)
    }
}

/// Client information (IP, user agent)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get("X-Real-IP")
                    .and_then(|h| h.to_str().ok())
                    .map(String::from)
            })
            .unwrap_or_default();

        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from)
            .unwrap_or_default();

        Ok(ClientInfo { ip, user_agent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tokio_test::assert_ok;

    async fn client_info(req: Request<()>) -> ClientInfo {
        let (mut parts, _) = req.into_parts();
        assert_ok!(ClientInfo::from_request_parts(&mut parts, &()).await)
    }

    #[tokio::test]
    async fn test_client_info_prefers_forwarded_for() {
        let req = assert_ok!(Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "10.0.0.2")
            .header("User-Agent", "curl/8.0")
            .body(()));

        let info = client_info(req).await;
        assert_eq!(info.ip, "203.0.113.7");
        assert_eq!(info.user_agent, "curl/8.0");
    }

    #[tokio::test]
    async fn test_client_info_defaults_empty() {
        let req = assert_ok!(Request::builder().body(()));
        assert_eq!(client_info(req).await, ClientInfo::default());
    }

    #[tokio::test]
    async fn test_auth_payload_missing() {
        let req = assert_ok!(Request::builder().body(()));
        let (mut parts, _) = req.into_parts();

        let result = AuthPayload::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingCredential)));
    }
}
