//! HS256 signed-claims tokens

use super::{check_key_length, Payload, TokenError, TokenMaker};
use crate::clock::{Clock, SystemClock};

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Wire claims: the payload plus the registered `iat`/`exp` for other JWT readers
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    payload: Payload,
    iat: i64,
    exp: i64,
}

/// JWT maker
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtMaker {
    pub fn new(secret_key: &str) -> Result<Self, TokenError> {
        Self::with_clock(secret_key, Arc::new(SystemClock))
    }

    pub fn with_clock(secret_key: &str, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        check_key_length(secret_key)?;

        // Expiry is judged against our clock after decoding, so an expired
        // token is only ever reported once its signature has checked out.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            validation,
            clock,
        })
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(
        &self,
        user_id: i64,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let payload = Payload::new(user_id, username, duration, self.clock.now())?;
        let claims = Claims {
            iat: payload.issued_at.timestamp(),
            exp: payload.expires_at.timestamp(),
            payload,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Key(e.to_string()))?;

        Ok((token, claims.payload))
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("JWT validation failed: {:?}", e);
            TokenError::InvalidToken
        })?;

        let payload = data.claims.payload;
        payload.check_expiry(self.clock.now())?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let maker = assert_ok!(JwtMaker::new(KEY));
        let payload = assert_ok!(Payload::new(1, "alice", Duration::minutes(5), chrono::Utc::now()));
        let claims = Claims {
            iat: payload.issued_at.timestamp(),
            exp: payload.expires_at.timestamp(),
            payload,
        };

        let token = assert_ok!(encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(KEY.as_bytes()),
        ));

        assert_eq!(maker.verify_token(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let maker = assert_ok!(JwtMaker::new(KEY));
        let (token, payload) = assert_ok!(maker.create_token(1, "alice", Duration::minutes(5)));

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let mut claims: serde_json::Value =
            assert_ok!(serde_json::from_slice(&assert_ok!(URL_SAFE_NO_PAD.decode(parts[1]))));
        claims["user_id"] = serde_json::json!(payload.user_id + 1);
        let forged_body = URL_SAFE_NO_PAD.encode(assert_ok!(serde_json::to_vec(&claims)));
        let forged = format!("{}.{}.{}", parts[0], forged_body, parts[2]);

        assert_eq!(maker.verify_token(&forged), Err(TokenError::InvalidToken));
    }

    #[test]
    fn test_claims_expose_registered_fields() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let maker = assert_ok!(JwtMaker::new(KEY));
        let (token, payload) = assert_ok!(maker.create_token(7, "bob", Duration::minutes(5)));
        let body = assert_ok!(URL_SAFE_NO_PAD.decode(token.split('.').nth(1).unwrap_or_default()));
        let claims: serde_json::Value = assert_ok!(serde_json::from_slice(&body));

        assert_eq!(claims["exp"], serde_json::json!(payload.expires_at.timestamp()));
        assert_eq!(claims["username"], "bob");
    }
}
