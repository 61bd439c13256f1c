use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::FieldErrors;
use super::UserResponseData;
use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::OnboardingStage;
use crate::domain::user::models::Password;
use crate::domain::user::models::Role;
use crate::domain::user::models::UserStatus;
use crate::domain::user::models::Username;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<ApiSuccess<UserResponseData>, ApiError> {
    let Json(body) = body?;
    let command = body.try_into_command()?;
    tracing::debug!(actor = %caller.user_id, handle = %command.handle, "Create requested");

    state
        .user_service
        .create_user(command)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::CREATED, "User created successfully", user.into()))
}

/// HTTP request body for creating a user (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateUserRequest {
    name: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    role: Option<String>,
    status: Option<String>,
    stage: Option<String>,
}

impl CreateUserRequest {
    fn try_into_command(self) -> Result<CreateUserCommand, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = errors.check("email", EmailAddress::new(self.email));
        let handle = errors.check("username", Username::new(self.username));
        let password = errors.check("password", Password::new(self.password));
        let name = errors.check_optional("name", self.name.map(DisplayName::new));
        let role = errors.check_optional("role", self.role.map(|r| r.parse::<Role>()));
        let status =
            errors.check_optional("status", self.status.map(|s| s.parse::<UserStatus>()));
        let stage =
            errors.check_optional("stage", self.stage.map(|s| s.parse::<OnboardingStage>()));

        if !errors.is_empty() {
            return Err(errors);
        }

        match (email, handle, password) {
            (Some(email), Some(handle), Some(password)) => Ok(CreateUserCommand {
                // Defaults to the handle, which always satisfies the name rules
                name: name.unwrap_or_else(|| DisplayName::from(&handle)),
                email,
                handle,
                password,
                role: role.unwrap_or(Role::User),
                status: status.unwrap_or(UserStatus::Unverified),
                stage,
            }),
            _ => Err(errors),
        }
    }
}
