//! Authentication utilities library
//!
//! Provides the authentication core for the user service:
//! - Password hashing (Argon2id, fixed work factor)
//! - ES256 access token issuance and validation over a P-256 key pair
//! - Authentication coordination
//!
//! Services define their own identity types and map the string claims onto them.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).is_ok());
//! assert!(hasher.verify("other_password", &hash).is_err());
//! ```
//!
//! ## Access Tokens
//! ```no_run
//! use auth::TokenAuthority;
//!
//! let authority = TokenAuthority::from_pem_files("keys/private.pem", "keys/public.pem")
//!     .expect("key pair should load");
//! let token = authority.issue_token("user123", "admin").unwrap();
//! let claims = authority.validate_token(&token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```
//!
//! ## Complete Authentication Flow
//! ```no_run
//! use auth::{Authenticator, TokenAuthority};
//!
//! let authority = TokenAuthority::from_pem_files("keys/private.pem", "keys/public.pem").unwrap();
//! let auth = Authenticator::new(authority);
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify and issue token
//! let result = auth.authenticate("password123", &hash, "user123", "user").unwrap();
//!
//! // Validate token
//! let claims = auth.validate_token(&result.access_token).unwrap();
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::AuthenticationResult;
pub use authenticator::Authenticator;
pub use jwt::Claims;
pub use jwt::KeyLoadError;
pub use jwt::TokenAuthority;
pub use jwt::TokenError;
pub use jwt::TOKEN_TTL_HOURS;
pub use password::PasswordError;
pub use password::PasswordHasher;
