//! RustPress Token Authentication
//!
//! Authentication core for RustPress APIs providing:
//! - Argon2id password hashing
//! - PASETO-style sealed tokens or HS256 JWTs behind one maker contract
//! - Refresh sessions bound to the refresh token that opened them
//! - Sign-up, sign-in, access token renewal and logout
//! - An axum gate that turns bearer tokens into verified payloads
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `TOKEN_SYMMETRIC_KEY` - Key for sealing/signing tokens (required, min 32 chars, exactly 32 for paseto)
//! - `TOKEN_KIND` - `paseto` or `jwt` (default: paseto)
//! - `ACCESS_TOKEN_DURATION` - Access token lifetime in seconds (default: 900)
//! - `REFRESH_TOKEN_DURATION` - Refresh token and session lifetime in seconds (default: 1296000)
//! - `ARGON2_MEMORY_COST` - Argon2 memory cost in KiB (default: 19456)
//! - `ARGON2_TIME_COST` - Argon2 iterations (default: 2)
//! - `ARGON2_PARALLELISM` - Argon2 lanes (default: 1)
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_token_auth::{require_auth, AuthConfig, AuthService, PgStore};
//!
//! let store = Arc::new(PgStore::new(db_pool));
//! let auth = AuthService::new(&AuthConfig::from_env()?, store.clone(), store)?;
//!
//! let response = auth.sign_in(sign_in_request, client_info).await?;
//!
//! let protected = Router::new()
//!     .route("/accounts", post(create_account))
//!     .layer(axum::middleware::from_fn_with_state(auth.gate(), require_auth));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, ErrorKind, SessionRejection};
pub use extractors::{AuthPayload, ClientInfo};
pub use middleware::{require_auth, AuthGate};
pub use models::*;
pub use password::PasswordHasher;
pub use service::AuthService;
pub use store::{MemoryStore, PgStore, SessionStore, StoreError, UserStore};
pub use token::{build_maker, Payload, TokenError, TokenKind, TokenMaker};
