use std::path::PathBuf;

use thiserror::Error;

/// Error type for token issuance and validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token is expired")]
    Expired,

    #[error("Token is not valid yet")]
    NotYetValid,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token algorithm is not accepted: {0}")]
    UnsupportedAlgorithm(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm(err.to_string())
            }
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Error type for loading the signing key pair.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("Failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {kind} key: {reason}")]
    InvalidKey { kind: &'static str, reason: String },

    #[error("Private and public keys do not form a pair: {0}")]
    KeyPairMismatch(String),
}
