//! Fixed P-256 key pairs for tests.
//!
//! Enabled for this crate's unit tests and, through the `testutil` feature,
//! for dependent crates:
//!
//! ```toml
//! [dev-dependencies]
//! auth = { path = "../auth", features = ["testutil"] }
//! ```
//!
//! Never use these keys outside tests; they are public.

use crate::authenticator::Authenticator;
use crate::jwt::TokenAuthority;

/// PKCS#8 private key of the primary test pair.
pub const PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/primary_private.pem");

/// SPKI public key of the primary test pair.
pub const PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/primary_public.pem");

/// PKCS#8 private key of an unrelated pair, for foreign-signature tests.
pub const FOREIGN_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/foreign_private.pem");

/// SPKI public key of the unrelated pair.
pub const FOREIGN_PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/foreign_public.pem");

/// Token authority over the primary test pair.
///
/// # Panics
///
/// Panics if the embedded fixtures fail to load.
pub fn token_authority() -> TokenAuthority {
    TokenAuthority::from_pem(PRIVATE_KEY_PEM.as_bytes(), PUBLIC_KEY_PEM.as_bytes())
        .expect("primary test key pair should load")
}

/// Token authority over the unrelated test pair.
///
/// # Panics
///
/// Panics if the embedded fixtures fail to load.
pub fn foreign_token_authority() -> TokenAuthority {
    TokenAuthority::from_pem(
        FOREIGN_PRIVATE_KEY_PEM.as_bytes(),
        FOREIGN_PUBLIC_KEY_PEM.as_bytes(),
    )
    .expect("foreign test key pair should load")
}

/// Authenticator over the primary test pair.
pub fn authenticator() -> Authenticator {
    Authenticator::new(token_authority())
}
