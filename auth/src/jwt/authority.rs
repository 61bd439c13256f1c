use std::path::Path;

use chrono::DateTime;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::KeyLoadError;
use super::errors::TokenError;

/// The only algorithm this authority signs with or accepts.
pub const ALGORITHM: Algorithm = Algorithm::ES256;

/// Issues and validates ES256 access tokens.
///
/// Holds one P-256 key pair for its whole lifetime. Construct it once at
/// startup and share it behind an `Arc`; it has no interior mutability.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenAuthority {
    /// Load the key pair from PEM files.
    ///
    /// # Arguments
    /// * `private_key_path` - PKCS#8 PEM file with the P-256 private key
    /// * `public_key_path` - SPKI PEM file with the matching public key
    ///
    /// # Errors
    /// * `Read` - A key file is missing or unreadable
    /// * `InvalidKey` - A file is not a valid EC key in PEM form
    /// * `KeyPairMismatch` - Tokens signed by the private key do not verify with the public key
    pub fn from_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, KeyLoadError> {
        let private_pem = read_key_file(private_key_path.as_ref())?;
        let public_pem = read_key_file(public_key_path.as_ref())?;

        Self::from_pem(&private_pem, &public_pem)
    }

    /// Load the key pair from PEM-encoded bytes.
    ///
    /// A probe token is signed and verified before returning, so a usable
    /// authority is guaranteed once this succeeds.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, KeyLoadError> {
        let encoding_key =
            EncodingKey::from_ec_pem(private_pem).map_err(|e| KeyLoadError::InvalidKey {
                kind: "private",
                reason: e.to_string(),
            })?;
        let decoding_key =
            DecodingKey::from_ec_pem(public_pem).map_err(|e| KeyLoadError::InvalidKey {
                kind: "public",
                reason: e.to_string(),
            })?;

        let mut validation = Validation::new(ALGORITHM);
        // Time window is checked against an explicit clock in `validate_token_at`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims = ["sub", "exp", "nbf"]
            .into_iter()
            .map(String::from)
            .collect();

        let authority = Self {
            encoding_key,
            decoding_key,
            validation,
        };
        authority.probe()?;
        tracing::debug!(algorithm = ?ALGORITHM, "Token key pair verified");

        Ok(authority)
    }

    /// Issue a token for a user, valid from now for 24 hours.
    ///
    /// # Errors
    /// * `Signing` - Token signing failed
    pub fn issue_token(&self, user_id: &str, role: &str) -> Result<String, TokenError> {
        self.issue_token_at(user_id, role, Utc::now())
    }

    /// Issue a token whose validity window starts at `issued_at`.
    pub fn issue_token_at(
        &self,
        user_id: &str,
        role: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims::for_user(user_id, role, issued_at);
        self.encode(&claims)
    }

    /// Validate a token against the current time.
    ///
    /// # Errors
    /// * `Malformed` - Token is not a decodable JWT or lacks required claims
    /// * `UnsupportedAlgorithm` - Header names any algorithm other than ES256
    /// * `InvalidSignature` - Token was tampered with or signed by another key
    /// * `Expired` - Current time is at or past `exp`
    /// * `NotYetValid` - Current time is before `nbf`
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Validate a token as of `now`.
    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        let now = now.timestamp();
        if claims.is_expired(now) {
            return Err(TokenError::Expired);
        }
        if claims.is_premature(now) {
            return Err(TokenError::NotYetValid);
        }

        Ok(claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn probe(&self) -> Result<(), KeyLoadError> {
        let token = self
            .issue_token("key-probe", "probe")
            .map_err(|e| KeyLoadError::InvalidKey {
                kind: "private",
                reason: e.to_string(),
            })?;

        match self.validate_token(&token) {
            Ok(_) => Ok(()),
            Err(TokenError::InvalidSignature) => Err(KeyLoadError::KeyPairMismatch(
                "probe token signature did not verify".to_string(),
            )),
            Err(e) => Err(KeyLoadError::InvalidKey {
                kind: "public",
                reason: e.to_string(),
            }),
        }
    }
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, KeyLoadError> {
    std::fs::read(path).map_err(|source| KeyLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
