use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Lifetime of every issued access token.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Identity claims carried by an access token.
///
/// The subject and role are plain strings so each service can map them onto
/// its own identifier and role types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Role of the subject at issuance
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims for a user, valid from `issued_at` for [`TOKEN_TTL_HOURS`].
    pub fn for_user(user_id: impl ToString, role: impl ToString, issued_at: DateTime<Utc>) -> Self {
        let expiration = issued_at + Duration::hours(TOKEN_TTL_HOURS);

        Self {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Check whether the token has expired at `now` (expiry is exclusive).
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Check whether the token may not be used yet at `now`.
    pub fn is_premature(&self, now: i64) -> bool {
        now < self.nbf
    }
}
