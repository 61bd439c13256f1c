use async_trait::async_trait;

use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginResult;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::PageRequest;
use crate::domain::user::models::Paginated;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserCredentials;
use crate::domain::user::models::UserFilter;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;

/// Port for user domain service operations.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Register a new account with default role, status and onboarding stage.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `UsernameAlreadyExists` - Handle is already taken
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<User, UserError>;

    /// Verify credentials and issue an access token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password (indistinguishable to callers)
    /// * `Token` - Token could not be signed
    /// * `DatabaseError` - Database operation failed
    async fn login(&self, command: LoginCommand) -> Result<LoginResult, UserError>;

    /// Create new user with caller-chosen attributes.
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` - Handle is already taken
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create_user(&self, command: CreateUserCommand) -> Result<User, UserError>;

    /// Retrieve user by unique identifier.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist or was deleted
    /// * `DatabaseError` - Database operation failed
    async fn get_user(&self, id: &UserId) -> Result<User, UserError>;

    /// First user matching every set field of `filter`, if any.
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, UserError>;

    async fn list_users(&self) -> Result<Vec<User>, UserError>;

    async fn list_users_paginated(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, UserError>;

    /// Update existing user with optional fields.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `UsernameAlreadyExists` - New handle belongs to another user
    /// * `EmailAlreadyExists` - New email belongs to another user
    /// * `DatabaseError` - Database operation failed
    async fn update_user(&self, id: &UserId, command: UpdateUserCommand)
        -> Result<User, UserError>;

    /// Soft-delete existing user.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn delete_user(&self, id: &UserId) -> Result<(), UserError>;
}

/// Persistence operations for user aggregate.
///
/// Every query ignores soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// First user matching every set field of `filter`; `None` when nothing matches.
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, UserError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    /// User and stored password hash for a login attempt.
    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserCredentials>, UserError>;

    async fn list_all(&self) -> Result<Vec<User>, UserError>;

    /// One page of matching users, newest first.
    async fn find_paginated(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, UserError>;

    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` - Handle is already taken
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: NewUser) -> Result<User, UserError>;

    /// Overwrite the mutable columns of `user`, replacing the password hash
    /// only when one is given.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `UsernameAlreadyExists` - New handle is already taken
    /// * `EmailAlreadyExists` - New email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn update(&self, user: User, password_hash: Option<String>)
        -> Result<User, UserError>;

    /// Mark the user as deleted.
    ///
    /// # Errors
    /// * `NotFound` - No live user with this id
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, id: &UserId) -> Result<(), UserError>;
}
