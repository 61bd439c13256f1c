use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::FieldErrors;
use super::UserResponseData;
use crate::domain::user::models::PageRequest;
use crate::domain::user::models::Paginated;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserFilter;
use crate::domain::user::models::UserStatus;
use crate::inbound::http::router::AppState;

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<ApiSuccess<Vec<UserResponseData>>, ApiError> {
    state
        .user_service
        .list_users()
        .await
        .map_err(ApiError::from)
        .map(|users| {
            ApiSuccess::new(
                StatusCode::OK,
                "Users retrieved successfully",
                users.iter().map(UserResponseData::from).collect(),
            )
        })
}

pub async fn list_users_paginated(
    State(state): State<AppState>,
    query: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<ApiSuccess<PaginatedResponseData>, ApiError> {
    let Query(params) = query?;
    let (filter, page) = params.try_into_query()?;

    state
        .user_service
        .list_users_paginated(&filter, page)
        .await
        .map_err(ApiError::from)
        .map(|ref result| {
            ApiSuccess::new(
                StatusCode::OK,
                "Paginated users retrieved successfully",
                result.into(),
            )
        })
}

/// Raw query string. Page and limit are parsed leniently: anything that is
/// not an integer counts as 0 and is then clamped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PaginationParams {
    page: Option<String>,
    limit: Option<String>,
    role: Option<String>,
    status: Option<String>,
}

fn lenient_int(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

impl PaginationParams {
    fn try_into_query(self) -> Result<(UserFilter, PageRequest), FieldErrors> {
        let page = PageRequest::new(
            lenient_int(self.page.as_deref()),
            lenient_int(self.limit.as_deref()),
        );

        let mut errors = FieldErrors::default();
        let role = errors.check_optional("role", self.role.map(|r| r.parse::<Role>()));
        let status =
            errors.check_optional("status", self.status.map(|s| s.parse::<UserStatus>()));

        if !errors.is_empty() {
            return Err(errors);
        }

        let filter = UserFilter {
            role,
            status,
            ..UserFilter::default()
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedResponseData {
    pub data: Vec<UserResponseData>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<&Paginated<User>> for PaginatedResponseData {
    fn from(result: &Paginated<User>) -> Self {
        Self {
            data: result.data.iter().map(UserResponseData::from).collect(),
            total: result.total,
            page: result.page,
            limit: result.limit,
            total_pages: result.total_pages,
        }
    }
}
