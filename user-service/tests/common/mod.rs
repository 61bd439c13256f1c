#![allow(dead_code)]

pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::Utc;
use serde_json::json;
use serde_json::Value;
use tokio::sync::RwLock;
use user_service::domain::user::models::EmailAddress;
use user_service::domain::user::models::NewUser;
use user_service::domain::user::models::PageRequest;
use user_service::domain::user::models::Paginated;
use user_service::domain::user::models::User;
use user_service::domain::user::models::UserCredentials;
use user_service::domain::user::models::UserFilter;
use user_service::domain::user::models::UserId;
use user_service::domain::user::ports::UserRepository;
use user_service::domain::user::service::UserService;
use user_service::inbound::http::router::create_router;
use user_service::inbound::http::router::AppState;
use user_service::user::errors::UserError;

/// Test application that spawns a real server over an in-memory store
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub authenticator: Arc<Authenticator>,
    pub repository: Arc<InMemoryUserRepository>,
}

impl TestApp {
    /// Spawn the application with per-request user revalidation enabled
    pub async fn spawn() -> Self {
        Self::spawn_with(true).await
    }

    pub async fn spawn_with(revalidate_user: bool) -> Self {
        Self::spawn_configured(revalidate_user, Duration::from_secs(30)).await
    }

    /// Spawn the application in a background task and return TestApp
    pub async fn spawn_configured(revalidate_user: bool, request_timeout: Duration) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryUserRepository::default());
        let authenticator = Arc::new(auth::testutil::authenticator());
        let user_service = Arc::new(UserService::new(
            Arc::clone(&repository),
            Arc::clone(&authenticator),
        ));

        let state = AppState {
            user_service,
            authenticator: Arc::clone(&authenticator),
            revalidate_user,
        };
        let router = create_router(state, request_timeout);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::new(),
            authenticator,
            repository,
        }
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    pub fn put_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .put(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    pub fn delete_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .delete(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Register an account and return the raw response
    pub async fn register(&self, email: &str, username: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/register")
            .json(&json!({
                "email": email,
                "username": username,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/login")
            .json(&json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register, log in, and return the new user's id and access token
    pub async fn signed_in_user(&self, email: &str, username: &str) -> (String, String) {
        let response = self.register(email, username, "password123").await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = self
            .login(email, "password123")
            .await
            .json()
            .await
            .expect("Failed to parse response");

        let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (id, token)
    }
}

struct Record {
    user: User,
    password_hash: String,
}

impl Record {
    fn is_live(&self) -> bool {
        self.user.deleted_at.is_none()
    }
}

/// `UserRepository` kept in memory. Uniqueness of email and handle covers
/// soft-deleted rows too, like the table constraints.
#[derive(Default)]
pub struct InMemoryUserRepository {
    records: RwLock<Vec<Record>>,
    latency: RwLock<Duration>,
}

impl InMemoryUserRepository {
    /// Make every following call wait `latency` before touching the records.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    async fn pause(&self) {
        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn newest_first(users: &mut [User]) {
    users.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.0.cmp(&b.id.0))
    });
}

fn conflict(records: &[Record], user: &User) -> Option<UserError> {
    let others = records.iter().filter(|r| r.user.id != user.id);

    for record in others {
        if record.user.email == user.email {
            return Some(UserError::EmailAlreadyExists(user.email.to_string()));
        }
        if record.user.handle == user.handle {
            return Some(UserError::UsernameAlreadyExists(user.handle.to_string()));
        }
    }
    None
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, UserError> {
        self.pause().await;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.is_live() && filter.matches(&r.user))
            .map(|r| r.user.clone())
            .next())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        self.pause().await;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.is_live() && r.user.id == *id)
            .map(|r| r.user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserCredentials>, UserError> {
        self.pause().await;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.is_live() && r.user.email == *email)
            .map(|r| UserCredentials {
                user: r.user.clone(),
                password_hash: r.password_hash.clone(),
            }))
    }

    async fn list_all(&self) -> Result<Vec<User>, UserError> {
        self.pause().await;
        let records = self.records.read().await;
        let mut users: Vec<User> = records
            .iter()
            .filter(|r| r.is_live())
            .map(|r| r.user.clone())
            .collect();
        newest_first(&mut users);
        Ok(users)
    }

    async fn find_paginated(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, UserError> {
        self.pause().await;
        let records = self.records.read().await;
        let mut users: Vec<User> = records
            .iter()
            .filter(|r| r.is_live() && filter.matches(&r.user))
            .map(|r| r.user.clone())
            .collect();
        newest_first(&mut users);

        let total = users.len() as u64;
        let data = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(Paginated::new(data, total, page))
    }

    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        self.pause().await;
        let now = Utc::now();
        let created = User {
            id: user.id,
            name: user.name,
            email: user.email,
            handle: user.handle,
            role: user.role,
            status: user.status,
            stage: user.stage,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut records = self.records.write().await;
        if let Some(err) = conflict(&records, &created) {
            return Err(err);
        }
        records.push(Record {
            user: created.clone(),
            password_hash: user.password_hash,
        });

        Ok(created)
    }

    async fn update(
        &self,
        mut user: User,
        password_hash: Option<String>,
    ) -> Result<User, UserError> {
        self.pause().await;
        let mut records = self.records.write().await;
        if let Some(err) = conflict(&records, &user) {
            return Err(err);
        }

        let record = records
            .iter_mut()
            .find(|r| r.is_live() && r.user.id == user.id)
            .ok_or(UserError::NotFound(user.id.to_string()))?;

        user.updated_at = Utc::now();
        record.user = user.clone();
        if let Some(hash) = password_hash {
            record.password_hash = hash;
        }

        Ok(user)
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserError> {
        self.pause().await;
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.is_live() && r.user.id == *id)
            .ok_or(UserError::NotFound(id.to_string()))?;

        record.user.deleted_at = Some(Utc::now());
        Ok(())
    }
}
