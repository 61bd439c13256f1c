use chrono::DateTime;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::TokenAuthority;
use crate::jwt::TokenError;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Authentication coordinator combining password verification and token issuance.
///
/// Owns the process-wide key pair through its [`TokenAuthority`]; share it
/// behind an `Arc`.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_authority: TokenAuthority,
}

/// Result of successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    /// Signed access token
    pub access_token: String,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(PasswordError),

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
}

impl From<PasswordError> for AuthenticationError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Mismatch => AuthenticationError::InvalidCredentials,
            other => AuthenticationError::PasswordError(other),
        }
    }
}

impl Authenticator {
    /// Create a new authenticator around a loaded token authority.
    pub fn new(token_authority: TokenAuthority) -> Self {
        Self {
            password_hasher: PasswordHasher::new(),
            token_authority,
        }
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `EmptyInput` - Password is empty
    /// * `HashingFailed` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify a password against a stored hash.
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<(), PasswordError> {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Burn one verification's worth of work for a login with no account.
    pub fn reject_unknown(&self, password: &str) {
        self.password_hasher.verify_decoy(password);
    }

    /// Verify credentials and issue an access token.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `user_id` - Subject of the issued token
    /// * `role` - Role recorded in the issued token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash could not be used
    /// * `TokenError` - Token signing failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        user_id: &str,
        role: &str,
    ) -> Result<AuthenticationResult, AuthenticationError> {
        self.password_hasher.verify(password, stored_hash)?;

        let access_token = self.token_authority.issue_token(user_id, role)?;

        Ok(AuthenticationResult { access_token })
    }

    /// Issue a token without password verification.
    pub fn issue_token(&self, user_id: &str, role: &str) -> Result<String, TokenError> {
        self.token_authority.issue_token(user_id, role)
    }

    /// Issue a token whose validity window starts at `issued_at`.
    pub fn issue_token_at(
        &self,
        user_id: &str,
        role: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.token_authority.issue_token_at(user_id, role, issued_at)
    }

    /// Validate a token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.token_authority.validate_token(token)
    }
}
