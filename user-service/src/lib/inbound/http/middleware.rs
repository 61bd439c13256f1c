use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use thiserror::Error;

use crate::domain::user::models::Role;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserStatus;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// Identity of the caller, stored in request extensions by [`authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub role: Role,
}

/// Reasons a request is turned away at the gate.
#[derive(Debug, Error)]
pub enum AuthGateError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not of the form 'Bearer <token>'")]
    MalformedHeader,

    #[error("token rejected: {0}")]
    InvalidToken(#[from] auth::TokenError),

    #[error("token claims unusable: {0}")]
    InvalidClaims(String),

    #[error("token subject {0} does not exist")]
    UnknownUser(UserId),

    #[error("user {0} is banned")]
    Banned(UserId),

    #[error("user lookup failed: {0}")]
    Storage(UserError),
}

impl IntoResponse for AuthGateError {
    fn into_response(self) -> Response {
        match self {
            AuthGateError::Storage(e) => ApiError::from(e).into_response(),
            rejected => {
                tracing::warn!(reason = %rejected, "Request rejected by auth gate");
                ApiError::Unauthorized("Unauthorized".to_string()).into_response()
            }
        }
    }
}

/// Middleware that validates bearer tokens and adds the caller's identity to request extensions
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthGateError> {
    let token = bearer_token(req.headers())?;
    let claims = state.authenticator.validate_token(token)?;

    let user_id = UserId::from_string(&claims.sub)
        .map_err(|e| AuthGateError::InvalidClaims(e.to_string()))?;
    let mut role = claims
        .role
        .parse::<Role>()
        .map_err(|e| AuthGateError::InvalidClaims(e.to_string()))?;

    if state.revalidate_user {
        let user = match state.user_service.get_user(&user_id).await {
            Ok(user) => user,
            Err(UserError::NotFound(_)) => return Err(AuthGateError::UnknownUser(user_id)),
            Err(e) => return Err(AuthGateError::Storage(e)),
        };

        if user.status == UserStatus::Banned {
            return Err(AuthGateError::Banned(user_id));
        }
        // Stored role wins over the one frozen into the token
        role = user.role;
    }

    req.extensions_mut()
        .insert(AuthenticatedUser { user_id, role });

    Ok(next.run(req).await)
}

/// Token from an `Authorization: Bearer <token>` header. Exactly one space,
/// exactly two parts, no other scheme.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthGateError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthGateError::MissingHeader)?;
    let value = header
        .to_str()
        .map_err(|_| AuthGateError::MalformedHeader)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(AuthGateError::MalformedHeader),
    }
}
