use thiserror::Error;

use crate::domain::user::models::Password;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for Username (handle) validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Username too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error(
        "Username must be letters and digits, optionally joined by single underscores"
    )]
    InvalidCharacters,
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Email length must be between {min} and {max} characters, got {actual}")]
    InvalidLength { min: usize, max: usize, actual: usize },

    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for DisplayName validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisplayNameError {
    #[error("Name length must be between {min} and {max} characters, got {actual}")]
    InvalidLength { min: usize, max: usize, actual: usize },
}

/// Error for plaintext password policy failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password length must be between {min} and {max} characters, got {actual}")]
    InvalidLength { min: usize, max: usize, actual: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role '{0}', expected one of: admin, user")]
pub struct RoleError(pub String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown status '{0}', expected one of: unverified, active, inactive, banned")]
pub struct StatusError(pub String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown onboarding stage '{0}', expected one of: email_verification, profile_setup, completed")]
pub struct StageError(pub String);

/// Why a login attempt was rejected. Only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    UnknownEmail,
    PasswordMismatch,
}

/// Top-level error for all user-related operations
#[derive(Debug, Clone, Error)]
pub enum UserError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid user ID: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid name: {0}")]
    InvalidName(#[from] DisplayNameError),

    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] PasswordPolicyError),

    #[error("Invalid role: {0}")]
    InvalidRole(#[from] RoleError),

    #[error("Invalid status: {0}")]
    InvalidStatus(#[from] StatusError),

    #[error("Invalid stage: {0}")]
    InvalidStage(#[from] StageError),

    // Domain-level errors
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Username already exists: {0}")]
    UsernameAlreadyExists(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    /// Client-visible text is identical for every cause.
    #[error("Invalid credentials")]
    InvalidCredentials(CredentialFailure),

    // Infrastructure errors
    #[error("Password error: {0}")]
    Password(auth::PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] auth::TokenError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<auth::PasswordError> for UserError {
    fn from(err: auth::PasswordError) -> Self {
        match err {
            auth::PasswordError::EmptyInput => {
                UserError::InvalidPassword(PasswordPolicyError::InvalidLength {
                    min: Password::MIN_LENGTH,
                    max: Password::MAX_LENGTH,
                    actual: 0,
                })
            }
            other => UserError::Password(other),
        }
    }
}

impl UserError {
    /// Whether the error is caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UserError::InvalidUserId(_)
                | UserError::InvalidUsername(_)
                | UserError::InvalidEmail(_)
                | UserError::InvalidName(_)
                | UserError::InvalidPassword(_)
                | UserError::InvalidRole(_)
                | UserError::InvalidStatus(_)
                | UserError::InvalidStage(_)
        )
    }
}
