use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::OnboardingStage;
use crate::domain::user::models::PageRequest;
use crate::domain::user::models::Paginated;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserCredentials;
use crate::domain::user::models::UserFilter;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserStatus;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

const USER_COLUMNS: &str =
    "id, name, email, handle, role, status, stage, created_at, updated_at, deleted_at";

const EMAIL_CONSTRAINT: &str = "users_email_key";
const HANDLE_CONSTRAINT: &str = "users_handle_key";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    handle: String,
    role: String,
    status: String,
    stage: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            name: DisplayName::new(row.name)?,
            email: EmailAddress::new(row.email)?,
            handle: Username::new(row.handle)?,
            role: row.role.parse::<Role>()?,
            status: row.status.parse::<UserStatus>()?,
            stage: row
                .stage
                .map(|stage| stage.parse::<OnboardingStage>())
                .transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// Append the live-row condition and every set filter field.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    builder.push(" WHERE deleted_at IS NULL");

    if let Some(email) = &filter.email {
        builder.push(" AND email = ").push_bind(email.as_str().to_string());
    }
    if let Some(handle) = &filter.handle {
        builder.push(" AND handle = ").push_bind(handle.as_str().to_string());
    }
    if let Some(role) = filter.role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

fn read_error(e: sqlx::Error) -> UserError {
    tracing::error!(error = %e, "User query failed");
    UserError::DatabaseError(e.to_string())
}

/// Map unique violations on email/handle to conflicts; everything else is a database error.
fn write_error(e: sqlx::Error, email: &EmailAddress, handle: &Username) -> UserError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => {
                    return UserError::EmailAlreadyExists(email.to_string());
                }
                Some(HANDLE_CONSTRAINT) => {
                    return UserError::UsernameAlreadyExists(handle.to_string());
                }
                _ => {}
            }
        }
    }

    tracing::error!(error = %e, "User write failed");
    UserError::DatabaseError(e.to_string())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, UserError> {
        let mut builder = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut builder, filter);
        builder.push(" LIMIT 1");

        builder
            .build_query_as::<UserRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        );

        sqlx::query_as::<_, UserRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserCredentials>, UserError> {
        let query = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users \
             WHERE email = $1 AND deleted_at IS NULL"
        );

        let row = sqlx::query_as::<_, CredentialsRow>(&query)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;

        match row {
            Some(r) => Ok(Some(UserCredentials {
                user: User::try_from(r.user)?,
                password_hash: r.password_hash,
            })),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<User>, UserError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE deleted_at IS NULL \
             ORDER BY created_at DESC, id"
        );

        sqlx::query_as::<_, UserRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn find_paginated(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, UserError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error)?;

        let mut select = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let data = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::new(data, total.max(0) as u64, page))
    }

    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let query = format!(
            "INSERT INTO users (id, name, email, handle, password_hash, role, status, stage) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user.id.0)
            .bind(user.name.as_str())
            .bind(user.email.as_str())
            .bind(user.handle.as_str())
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .bind(user.stage.map(|stage| stage.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, &user.email, &user.handle))?;

        User::try_from(row)
    }

    async fn update(
        &self,
        user: User,
        password_hash: Option<String>,
    ) -> Result<User, UserError> {
        let query = format!(
            "UPDATE users \
             SET name = $2, email = $3, handle = $4, role = $5, status = $6, stage = $7, \
                 password_hash = COALESCE($8, password_hash), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user.id.0)
            .bind(user.name.as_str())
            .bind(user.email.as_str())
            .bind(user.handle.as_str())
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .bind(user.stage.map(|stage| stage.as_str()))
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, &user.email, &user.handle))?;

        match row {
            Some(row) => User::try_from(row),
            None => Err(UserError::NotFound(user.id.to_string())),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(read_error)?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
