use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::FieldErrors;
use super::UserResponseData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::Username;
use crate::inbound::http::router::AppState;

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiSuccess<UserResponseData>, ApiError> {
    let Json(body) = body?;

    state
        .user_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| {
            ApiSuccess::new(StatusCode::CREATED, "User registered successfully", user.into())
        })
}

/// HTTP request body for self-service registration (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = errors.check("email", EmailAddress::new(self.email));
        let handle = errors.check("username", Username::new(self.username));
        let password = errors.check("password", Password::new(self.password));

        match (email, handle, password) {
            (Some(email), Some(handle), Some(password)) => Ok(RegisterCommand {
                email,
                handle,
                password,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_valid_request_becomes_command() {
        let command = request("alice@example.com", "alice_1", "password123")
            .try_into_command()
            .unwrap();
        assert_eq!(command.handle.as_str(), "alice_1");
    }

    #[test]
    fn test_every_invalid_field_is_reported() {
        let errors = request("nope", "_x", "short")
            .try_into_command()
            .unwrap_err();

        let json = serde_json::to_value(&errors).unwrap();
        assert!(json.get("email").is_some());
        assert!(json.get("username").is_some());
        assert!(json.get("password").is_some());
    }
}
