use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;

use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginResult;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::OnboardingStage;
use crate::domain::user::models::PageRequest;
use crate::domain::user::models::Paginated;
use crate::domain::user::models::Password;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::Role;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserFilter;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserStatus;
use crate::domain::user::models::Username;
use crate::user::errors::CredentialFailure;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Domain service implementation for user operations.
///
/// Concrete implementation of UserServicePort with dependency injection.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and token issuance, shared with the Auth Gate
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    /// Fail if `email` or `handle` is held by a live user other than `owner`.
    async fn ensure_available(
        &self,
        email: Option<&EmailAddress>,
        handle: Option<&Username>,
        owner: Option<&UserId>,
    ) -> Result<(), UserError> {
        let taken_by_other = |user: &User| owner.map_or(true, |id| user.id != *id);

        if let Some(email) = email {
            let filter = UserFilter::by_email(email.clone());
            if let Some(existing) = self.repository.find_one(&filter).await? {
                if taken_by_other(&existing) {
                    return Err(UserError::EmailAlreadyExists(email.to_string()));
                }
            }
        }

        if let Some(handle) = handle {
            let filter = UserFilter::by_handle(handle.clone());
            if let Some(existing) = self.repository.find_one(&filter).await? {
                if taken_by_other(&existing) {
                    return Err(UserError::UsernameAlreadyExists(handle.to_string()));
                }
            }
        }

        Ok(())
    }

    fn hash(&self, password: &Password) -> Result<String, UserError> {
        Ok(self.authenticator.hash_password(password.expose())?)
    }
}

#[async_trait]
impl<UR> UserServicePort for UserService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<User, UserError> {
        self.ensure_available(Some(&command.email), Some(&command.handle), None)
            .await?;

        let password_hash = self.hash(&command.password)?;

        let new_user = NewUser {
            id: UserId::new(),
            name: DisplayName::from(&command.handle),
            email: command.email,
            handle: command.handle,
            password_hash,
            role: Role::User,
            status: UserStatus::Unverified,
            stage: Some(OnboardingStage::EmailVerification),
        };

        let user = self.repository.create(new_user).await?;
        tracing::info!(user_id = %user.id, handle = %user.handle, "User registered");

        Ok(user)
    }

    async fn login(&self, command: LoginCommand) -> Result<LoginResult, UserError> {
        let Some(credentials) = self.repository.find_credentials(&command.email).await? else {
            // Same hashing cost as a wrong password
            self.authenticator.reject_unknown(command.password.expose());
            tracing::warn!(reason = ?CredentialFailure::UnknownEmail, "Login rejected");
            return Err(UserError::InvalidCredentials(CredentialFailure::UnknownEmail));
        };

        let user = credentials.user;
        let result = self.authenticator.authenticate(
            command.password.expose(),
            &credentials.password_hash,
            &user.id.to_string(),
            user.role.as_str(),
        );

        match result {
            Ok(authenticated) => {
                tracing::info!(user_id = %user.id, "User logged in");
                Ok(LoginResult {
                    user,
                    access_token: authenticated.access_token,
                })
            }
            Err(AuthenticationError::InvalidCredentials) => {
                tracing::warn!(
                    user_id = %user.id,
                    reason = ?CredentialFailure::PasswordMismatch,
                    "Login rejected"
                );
                Err(UserError::InvalidCredentials(
                    CredentialFailure::PasswordMismatch,
                ))
            }
            Err(AuthenticationError::PasswordError(e)) => {
                tracing::error!(user_id = %user.id, error = %e, "Stored password hash unusable");
                Err(UserError::Password(e))
            }
            Err(AuthenticationError::TokenError(e)) => Err(UserError::Token(e)),
        }
    }

    async fn create_user(&self, command: CreateUserCommand) -> Result<User, UserError> {
        self.ensure_available(Some(&command.email), Some(&command.handle), None)
            .await?;

        let password_hash = self.hash(&command.password)?;

        let new_user = NewUser {
            id: UserId::new(),
            name: command.name,
            email: command.email,
            handle: command.handle,
            password_hash,
            role: command.role,
            status: command.status,
            stage: command.stage,
        };

        let user = self.repository.create(new_user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User created");

        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, UserError> {
        self.repository.find_one(filter).await
    }

    async fn list_users(&self) -> Result<Vec<User>, UserError> {
        self.repository.list_all().await
    }

    async fn list_users_paginated(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, UserError> {
        self.repository.find_paginated(filter, page).await
    }

    async fn update_user(
        &self,
        id: &UserId,
        command: UpdateUserCommand,
    ) -> Result<User, UserError> {
        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))?;

        let new_email = command.email.filter(|email| *email != user.email);
        let new_handle = command.handle.filter(|handle| *handle != user.handle);
        self.ensure_available(new_email.as_ref(), new_handle.as_ref(), Some(id))
            .await?;

        if let Some(email) = new_email {
            user.email = email;
        }
        if let Some(handle) = new_handle {
            user.handle = handle;
        }
        if let Some(name) = command.name {
            user.name = name;
        }
        if let Some(role) = command.role {
            user.role = role;
        }
        if let Some(status) = command.status {
            user.status = status;
        }
        if let Some(stage) = command.stage {
            user.stage = Some(stage);
        }

        let password_hash = command
            .password
            .as_ref()
            .map(|password| self.hash(password))
            .transpose()?;

        let updated_user = self.repository.update(user, password_hash).await?;
        tracing::info!(user_id = %updated_user.id, "User updated");

        Ok(updated_user)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), UserError> {
        self.repository.delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::mock;

    use super::*;
    use crate::domain::user::models::UserCredentials;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
            async fn find_credentials(&self, email: &EmailAddress) -> Result<Option<UserCredentials>, UserError>;
            async fn list_all(&self) -> Result<Vec<User>, UserError>;
            async fn find_paginated(&self, filter: &UserFilter, page: PageRequest) -> Result<Paginated<User>, UserError>;
            async fn create(&self, user: NewUser) -> Result<User, UserError>;
            async fn update(&self, user: User, password_hash: Option<String>) -> Result<User, UserError>;
            async fn delete(&self, id: &UserId) -> Result<(), UserError>;
        }
    }

    fn service(repository: MockTestUserRepository) -> UserService<MockTestUserRepository> {
        UserService::new(
            Arc::new(repository),
            Arc::new(auth::testutil::authenticator()),
        )
    }

    fn stored_user(handle: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            name: DisplayName::new(handle.to_string()).unwrap(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            handle: Username::new(handle.to_string()).unwrap(),
            role: Role::User,
            status: UserStatus::Active,
            stage: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn materialize(new_user: NewUser) -> User {
        let now = Utc::now();
        User {
            id: new_user.id,
            name: new_user.name,
            email: new_user.email,
            handle: new_user.handle,
            role: new_user.role,
            status: new_user.status,
            stage: new_user.stage,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn register_command(handle: &str, email: &str) -> RegisterCommand {
        RegisterCommand {
            email: EmailAddress::new(email.to_string()).unwrap(),
            handle: Username::new(handle.to_string()).unwrap(),
            password: Password::new("password123".to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_register_applies_defaults() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_find_one()
            .times(2)
            .returning(|_| Ok(None));

        repository
            .expect_create()
            .withf(|user| {
                user.handle.as_str() == "testuser"
                    && user.name.as_str() == "testuser"
                    && user.role == Role::User
                    && user.status == UserStatus::Unverified
                    && user.stage == Some(OnboardingStage::EmailVerification)
                    && user.password_hash.starts_with("$argon2id")
            })
            .times(1)
            .returning(|user| Ok(materialize(user)));

        let result = service(repository)
            .register(register_command("testuser", "test@example.com"))
            .await;

        let user = result.unwrap();
        assert_eq!(user.email.as_str(), "test@example.com");
        assert_eq!(user.status, UserStatus::Unverified);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user("someone", "test@example.com");

        repository
            .expect_find_one()
            .withf(|filter| filter.email.is_some())
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        repository.expect_create().times(0);

        let result = service(repository)
            .register(register_command("testuser", "test@example.com"))
            .await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_duplicate_handle() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user("testuser", "other@example.com");

        repository
            .expect_find_one()
            .withf(|filter| filter.email.is_some())
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_find_one()
            .withf(|filter| filter.handle.is_some())
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        repository.expect_create().times(0);

        let result = service(repository)
            .register(register_command("testuser", "test@example.com"))
            .await;

        assert!(matches!(result, Err(UserError::UsernameAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_insert_race_surfaces_conflict() {
        let mut repository = MockTestUserRepository::new();

        repository.expect_find_one().returning(|_| Ok(None));
        repository
            .expect_create()
            .times(1)
            .returning(|user| Err(UserError::EmailAlreadyExists(user.email.to_string())));

        let result = service(repository)
            .register(register_command("testuser", "test@example.com"))
            .await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let authenticator = Arc::new(auth::testutil::authenticator());
        let hash = authenticator.hash_password("password123").unwrap();
        let user = stored_user("testuser", "test@example.com");
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_credentials()
            .times(1)
            .returning(move |_| {
                Ok(Some(UserCredentials {
                    user: user.clone(),
                    password_hash: hash.clone(),
                }))
            });

        let service = UserService::new(Arc::new(repository), authenticator.clone());
        let result = service
            .login(LoginCommand {
                email: EmailAddress::new("test@example.com".to_string()).unwrap(),
                password: Password::new("password123".to_string()).unwrap(),
            })
            .await
            .unwrap();

        let claims = authenticator.validate_token(&result.access_token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "user");
        assert_eq!(result.user.id, user_id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let authenticator = Arc::new(auth::testutil::authenticator());
        let hash = authenticator.hash_password("password123").unwrap();
        let user = stored_user("testuser", "test@example.com");

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_credentials()
            .withf(|email| email.as_str() == "test@example.com")
            .returning(move |_| {
                Ok(Some(UserCredentials {
                    user: user.clone(),
                    password_hash: hash.clone(),
                }))
            });
        repository
            .expect_find_credentials()
            .withf(|email| email.as_str() == "nobody@example.com")
            .returning(|_| Ok(None));

        let service = UserService::new(Arc::new(repository), authenticator);

        let wrong_password = service
            .login(LoginCommand {
                email: EmailAddress::new("test@example.com".to_string()).unwrap(),
                password: Password::new("wrongpassword".to_string()).unwrap(),
            })
            .await
            .unwrap_err();
        let unknown_email = service
            .login(LoginCommand {
                email: EmailAddress::new("nobody@example.com".to_string()).unwrap(),
                password: Password::new("password123".to_string()).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            wrong_password,
            UserError::InvalidCredentials(CredentialFailure::PasswordMismatch)
        ));
        assert!(matches!(
            unknown_email,
            UserError::InvalidCredentials(CredentialFailure::UnknownEmail)
        ));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_unknown_email_costs_a_password_verification() {
        let authenticator = Arc::new(auth::testutil::authenticator());
        let hash = authenticator.hash_password("password123").unwrap();

        let started = std::time::Instant::now();
        let _ = authenticator.verify_password("wrongpassword", &hash);
        let verification = started.elapsed();

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_credentials()
            .returning(|_| Ok(None));
        let service = UserService::new(Arc::new(repository), authenticator);

        let started = std::time::Instant::now();
        let result = service
            .login(LoginCommand {
                email: EmailAddress::new("nobody@example.com".to_string()).unwrap(),
                password: Password::new("password123".to_string()).unwrap(),
            })
            .await;
        let unknown_email = started.elapsed();

        assert!(result.is_err());
        // Loose bound; both paths run one Argon2 verification
        assert!(
            unknown_email * 4 >= verification,
            "unknown email took {unknown_email:?}, a verification takes {verification:?}"
        );
    }

    #[tokio::test]
    async fn test_create_user_keeps_requested_attributes() {
        let mut repository = MockTestUserRepository::new();

        repository.expect_find_one().times(2).returning(|_| Ok(None));
        repository
            .expect_create()
            .withf(|user| user.role == Role::Admin && user.status == UserStatus::Active)
            .times(1)
            .returning(|user| Ok(materialize(user)));

        let command = CreateUserCommand {
            name: DisplayName::new("Ada Admin".to_string()).unwrap(),
            email: EmailAddress::new("ada@example.com".to_string()).unwrap(),
            handle: Username::new("ada".to_string()).unwrap(),
            password: Password::new("password123".to_string()).unwrap(),
            role: Role::Admin,
            status: UserStatus::Active,
            stage: Some(OnboardingStage::Completed),
        };

        let user = service(repository).create_user(command).await.unwrap();
        assert_eq!(user.name.as_str(), "Ada Admin");
        assert_eq!(user.stage, Some(OnboardingStage::Completed));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let result = service(repository).get_user(&UserId::new()).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_user_success() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user("olduser", "old@example.com");
        let user_id = existing.id;

        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        repository.expect_find_one().times(2).returning(|_| Ok(None));
        repository
            .expect_update()
            .withf(|user, password_hash| {
                user.handle.as_str() == "newuser"
                    && user.email.as_str() == "new@example.com"
                    && password_hash
                        .as_deref()
                        .is_some_and(|hash| hash.starts_with("$argon2id"))
            })
            .times(1)
            .returning(|user, _| Ok(user));

        let command = UpdateUserCommand {
            handle: Some(Username::new("newuser".to_string()).unwrap()),
            email: Some(EmailAddress::new("new@example.com".to_string()).unwrap()),
            password: Some(Password::new("newpassword".to_string()).unwrap()),
            ..UpdateUserCommand::default()
        };

        let updated = service(repository)
            .update_user(&user_id, command)
            .await
            .unwrap();
        assert_eq!(updated.handle.as_str(), "newuser");
        assert_eq!(updated.email.as_str(), "new@example.com");
    }

    #[tokio::test]
    async fn test_update_user_keeping_own_email_is_not_a_conflict() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user("olduser", "old@example.com");
        let user_id = existing.id;

        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repository.expect_find_one().times(0);
        repository
            .expect_update()
            .withf(|user, password_hash| {
                user.status == UserStatus::Banned && password_hash.is_none()
            })
            .times(1)
            .returning(|user, _| Ok(user));

        let command = UpdateUserCommand {
            email: Some(EmailAddress::new("old@example.com".to_string()).unwrap()),
            status: Some(UserStatus::Banned),
            ..UpdateUserCommand::default()
        };

        let updated = service(repository)
            .update_user(&user_id, command)
            .await
            .unwrap();
        assert_eq!(updated.status, UserStatus::Banned);
    }

    #[tokio::test]
    async fn test_update_user_email_taken_by_other() {
        let mut repository = MockTestUserRepository::new();
        let existing = stored_user("olduser", "old@example.com");
        let other = stored_user("other", "taken@example.com");
        let user_id = existing.id;

        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repository
            .expect_find_one()
            .returning(move |_| Ok(Some(other.clone())));
        repository.expect_update().times(0);

        let command = UpdateUserCommand {
            email: Some(EmailAddress::new("taken@example.com".to_string()).unwrap()),
            ..UpdateUserCommand::default()
        };

        let result = service(repository).update_user(&user_id, command).await;
        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_user_not_found() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let command = UpdateUserCommand {
            handle: Some(Username::new("newuser".to_string()).unwrap()),
            ..UpdateUserCommand::default()
        };

        let result = service(repository)
            .update_user(&UserId::new(), command)
            .await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_user_success() {
        let mut repository = MockTestUserRepository::new();
        let user_id = UserId::new();

        repository
            .expect_delete()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));

        assert!(service(repository).delete_user(&user_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user_not_found() {
        let mut repository = MockTestUserRepository::new();
        let user_id = UserId::new();

        repository
            .expect_delete()
            .times(1)
            .returning(move |_| Err(UserError::NotFound(user_id.to_string())));

        let result = service(repository).delete_user(&user_id).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }
}
