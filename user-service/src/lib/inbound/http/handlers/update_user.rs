use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::OnboardingStage;
use crate::domain::user::models::Password;
use crate::domain::user::models::Role;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserStatus;
use crate::domain::user::models::Username;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::handlers::ApiSuccess;
use crate::inbound::http::handlers::FieldErrors;
use crate::inbound::http::handlers::UserResponseData;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// HTTP request body for updating a user (raw JSON)
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub stage: Option<String>,
}

impl UpdateUserRequest {
    fn try_into_command(self) -> Result<UpdateUserCommand, FieldErrors> {
        let mut errors = FieldErrors::default();

        let command = UpdateUserCommand {
            name: errors.check_optional("name", self.name.map(DisplayName::new)),
            email: errors.check_optional("email", self.email.map(EmailAddress::new)),
            handle: errors.check_optional("username", self.username.map(Username::new)),
            // An empty password is a policy violation, not "leave unchanged"
            password: errors.check_optional("password", self.password.map(Password::new)),
            role: errors.check_optional("role", self.role.map(|r| r.parse::<Role>())),
            status: errors.check_optional("status", self.status.map(|s| s.parse::<UserStatus>())),
            stage: errors.check_optional(
                "stage",
                self.stage.map(|s| s.parse::<OnboardingStage>()),
            ),
        };

        if errors.is_empty() {
            Ok(command)
        } else {
            Err(errors)
        }
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    req: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiSuccess<UserResponseData>, ApiError> {
    // Parse user ID and request at HTTP boundary - errors automatically converted
    let user_id = UserId::from_string(&id).map_err(UserError::from)?;
    let Json(req) = req?;
    let command = req.try_into_command()?;
    tracing::debug!(user_id = %user_id, actor = %caller.user_id, "Update requested");

    state
        .user_service
        .update_user(&user_id, command)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, "User updated successfully", user.into()))
}
