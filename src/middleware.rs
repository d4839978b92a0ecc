//! Authentication Middleware
//!
//! [`AuthGate`] turns an `Authorization` header into a verified [`Payload`].
//! [`require_auth`] wires it into axum: on success the payload is stored in
//! the request extensions (keyed by its type) for [`AuthPayload`] to read, on
//! failure the request is answered with the rejection and goes no further.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/accounts/:id", get(get_account))
//!     .layer(axum::middleware::from_fn_with_state(auth.gate(), require_auth));
//! ```
//!
//! [`AuthPayload`]: crate::extractors::AuthPayload

use crate::error::AuthError;
use crate::token::{Payload, TokenMaker};

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Accepted authorization scheme, compared case-insensitively
pub const BEARER_SCHEME: &str = "bearer";

/// Bearer token gate
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<dyn TokenMaker>,
}

impl AuthGate {
    pub fn new(tokens: Arc<dyn TokenMaker>) -> Self {
        Self { tokens }
    }

    /// Verify a raw `Authorization` header value
    ///
    /// Token errors are passed through unchanged.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Payload, AuthError> {
        let header = match header {
            Some(h) if !h.is_empty() => h,
            _ => return Err(AuthError::MissingCredential),
        };

        let mut fields = header.split_whitespace();
        let (Some(scheme), Some(token)) = (fields.next(), fields.next()) else {
            return Err(AuthError::MalformedCredential);
        };

        let scheme = scheme.to_lowercase();
        if scheme != BEARER_SCHEME {
            return Err(AuthError::UnsupportedScheme(scheme));
        }

        Ok(self.tokens.verify_token(token)?)
    }
}

/// Require a valid bearer access token
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|h| h.to_str().map_err(|_| AuthError::MalformedCredential))
        .transpose()?;

    let payload = gate.authenticate(header)?;

    req.extensions_mut().insert(payload);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::extractors::AuthPayload;
    use crate::token::{build_maker, TokenError, TokenKind};

    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use chrono::Duration;
    use tokio_test::{assert_err, assert_ok};
    use tower::ServiceExt;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn gate() -> (AuthGate, Arc<dyn TokenMaker>) {
        let maker = assert_ok!(build_maker(TokenKind::Paseto, KEY, Arc::new(SystemClock)));
        (AuthGate::new(maker.clone()), maker)
    }

    #[test]
    fn test_bearer_accepted_any_case() {
        let (gate, maker) = gate();
        let (token, issued) = assert_ok!(maker.create_token(1, "alice", Duration::minutes(5)));

        for scheme in ["Bearer", "bearer", "BEARER"] {
            let payload = assert_ok!(gate.authenticate(Some(&format!("{scheme} {token}"))));
            assert_eq!(payload, issued);
        }
    }

    #[test]
    fn test_header_rejections() {
        let (gate, _) = gate();

        assert!(matches!(
            gate.authenticate(None),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            gate.authenticate(Some("")),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            gate.authenticate(Some("Bearer")),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            gate.authenticate(Some("   ")),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            gate.authenticate(Some("Basic xyz")),
            Err(AuthError::UnsupportedScheme(s)) if s == "basic"
        ));
    }

    #[test]
    fn test_token_errors_forwarded() {
        let (gate, _) = gate();
        let err = assert_err!(gate.authenticate(Some("Bearer not-a-token")));
        assert!(matches!(err, AuthError::Token(TokenError::InvalidToken)));
    }

    async fn whoami(AuthPayload(payload): AuthPayload) -> String {
        payload.username
    }

    fn app(gate: AuthGate) -> Router {
        Router::new()
            .route("/me", get(whoami))
            .layer(axum::middleware::from_fn_with_state(gate, require_auth))
    }

    #[tokio::test]
    async fn test_middleware_attaches_payload() {
        let (gate, maker) = gate();
        let (token, _) = assert_ok!(maker.create_token(1, "alice", Duration::minutes(5)));

        let req = assert_ok!(HttpRequest::builder()
            .uri("/me")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty()));
        let res = assert_ok!(app(gate).oneshot(req).await);
        assert_eq!(res.status(), StatusCode::OK);

        let body = assert_ok!(axum::body::to_bytes(res.into_body(), usize::MAX).await);
        assert_eq!(&body[..], b"alice");
    }

    #[tokio::test]
    async fn test_middleware_short_circuits() {
        let (gate, _) = gate();

        for header in [None, Some("Basic xyz"), Some("Bearer"), Some("Bearer forged")] {
            let mut builder = HttpRequest::builder().uri("/me");
            if let Some(h) = header {
                builder = builder.header("Authorization", h);
            }
            let req = assert_ok!(builder.body(Body::empty()));

            let res = assert_ok!(app(gate.clone()).oneshot(req).await);
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{header:?}");
        }
    }
}
