//! Profile, stats and follow endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polirate_core::{Nickname, PaginationParams};

use super::optional_text;
use crate::auth::AuthUser;
use crate::db::repos::{FollowDirection, FollowRepo, FollowUser, Profile, ProfilePatch, ProfileRepo, UserStats};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, ValidUuid};
use crate::http::response::{created, ok, page, ApiResponse};
use crate::http::server::AppState;

const MAX_URL_LEN: usize = 2_048;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub nickname: Option<String>,
    /// Empty string clears the avatar
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowState {
    pub user_id: Uuid,
    pub following: bool,
}

/// GET /api/me
async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Profile>>, ApiError> {
    let profile = ProfileRepo::new(&state.pool).me(&user).await?;
    Ok(ok(profile))
}

/// PATCH /api/me
async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<Profile>>, ApiError> {
    let patch = ProfilePatch {
        nickname: req.nickname.as_deref().map(Nickname::new).transpose()?,
        avatar_url: match req.avatar_url {
            Some(url) => Some(optional_text("avatar_url", Some(url), MAX_URL_LEN)?),
            None => None,
        },
    };

    let profile = ProfileRepo::new(&state.pool).update(&user, patch).await?;
    Ok(ok(profile))
}

/// GET /api/users/{id}/stats
async fn stats(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<UserStats>>, ApiError> {
    let stats = ProfileRepo::new(&state.pool).stats(id).await?;
    Ok(ok(stats))
}

/// POST /api/users/{id}/follow
async fn follow(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<(StatusCode, Json<ApiResponse<FollowState>>), ApiError> {
    FollowRepo::new(&state.pool).follow(&user, id).await?;
    Ok(created(FollowState {
        user_id: id,
        following: true,
    }))
}

/// DELETE /api/users/{id}/follow
async fn unfollow(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<FollowState>>, ApiError> {
    FollowRepo::new(&state.pool).unfollow(user.id, id).await?;
    Ok(ok(FollowState {
        user_id: id,
        following: false,
    }))
}

/// GET /api/users/{id}/followers
async fn followers(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<ApiResponse<Vec<FollowUser>>>, ApiError> {
    let result = FollowRepo::new(&state.pool)
        .list(id, FollowDirection::Followers, params.pagination())
        .await?;
    Ok(page(result))
}

/// GET /api/users/{id}/following
async fn following(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<ApiResponse<Vec<FollowUser>>>, ApiError> {
    let result = FollowRepo::new(&state.pool)
        .list(id, FollowDirection::Following, params.pagination())
        .await?;
    Ok(page(result))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(me).patch(update_me))
        .route("/api/users/{id}/stats", get(stats))
        .route("/api/users/{id}/follow", post(follow).delete(unfollow))
        .route("/api/users/{id}/followers", get(followers))
        .route("/api/users/{id}/following", get(following))
}
