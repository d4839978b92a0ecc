//! Authenticated-encryption tokens
//!
//! Layout follows PASETO `v2.local`: the `v2.local.` header, then
//! base64url(nonce || ciphertext). The payload is JSON sealed with
//! XChaCha20-Poly1305 under a 24-byte random nonce, and the header, nonce and
//! (empty) footer are bound in as associated data through pre-authentication
//! encoding.

use super::{check_key_length, Payload, TokenError, TokenMaker, MIN_SECRET_KEY_LENGTH};
use crate::clock::{Clock, SystemClock};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload as Sealed};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use chrono::Duration;
use std::sync::Arc;

const HEADER: &str = "v2.local.";
const NONCE_SIZE: usize = 24;
const TAG_SIZE: usize = 16;

/// PASETO-style maker
pub struct PasetoMaker {
    cipher: XChaCha20Poly1305,
    clock: Arc<dyn Clock>,
}

impl PasetoMaker {
    pub fn new(secret_key: &str) -> Result<Self, TokenError> {
        Self::with_clock(secret_key, Arc::new(SystemClock))
    }

    /// The key must be exactly 32 bytes
    pub fn with_clock(secret_key: &str, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        check_key_length(secret_key)?;
        if secret_key.len() != MIN_SECRET_KEY_LENGTH {
            return Err(TokenError::Key(format!(
                "key must be exactly {MIN_SECRET_KEY_LENGTH} bytes, got {}",
                secret_key.len()
            )));
        }

        let cipher = XChaCha20Poly1305::new_from_slice(secret_key.as_bytes())
            .map_err(|e| TokenError::Key(e.to_string()))?;

        Ok(Self { cipher, clock })
    }
}

impl TokenMaker for PasetoMaker {
    fn create_token(
        &self,
        user_id: i64,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let payload = Payload::new(user_id, username, duration, self.clock.now())?;
        let message = serde_json::to_vec(&payload).map_err(|e| TokenError::Key(e.to_string()))?;

        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let aad = pre_auth_encode(&[HEADER.as_bytes(), nonce.as_slice(), b""]);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, Sealed { msg: &message, aad: &aad })
            .map_err(|e| TokenError::Key(e.to_string()))?;

        let mut body = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        body.extend_from_slice(&nonce);
        body.extend_from_slice(&ciphertext);

        Ok((format!("{HEADER}{}", URL_SAFE_NO_PAD.encode(body)), payload))
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let encoded = token.strip_prefix(HEADER).ok_or(TokenError::InvalidToken)?;
        // Footers are never issued
        if encoded.contains('.') {
            return Err(TokenError::InvalidToken);
        }

        let body = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| TokenError::InvalidToken)?;
        if body.len() < NONCE_SIZE + TAG_SIZE {
            return Err(TokenError::InvalidToken);
        }

        let (nonce, ciphertext) = body.split_at(NONCE_SIZE);
        let aad = pre_auth_encode(&[HEADER.as_bytes(), nonce, b""]);
        let message = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), Sealed { msg: ciphertext, aad: &aad })
            .map_err(|_| {
                tracing::debug!("PASETO decryption failed");
                TokenError::InvalidToken
            })?;

        let payload: Payload =
            serde_json::from_slice(&message).map_err(|_| TokenError::InvalidToken)?;
        payload.check_expiry(self.clock.now())?;
        Ok(payload)
    }
}

/// PASETO pre-authentication encoding
fn pre_auth_encode(pieces: &[&[u8]]) -> Vec<u8> {
    fn le64(n: usize) -> [u8; 8] {
        ((n as u64) & (u64::MAX >> 1)).to_le_bytes()
    }

    let mut out = Vec::with_capacity(8 + pieces.iter().map(|p| 8 + p.len()).sum::<usize>());
    out.extend_from_slice(&le64(pieces.len()));
    for piece in pieces {
        out.extend_from_slice(&le64(piece.len()));
        out.extend_from_slice(piece);
    }
    out
}
