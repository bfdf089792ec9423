//! Bookmark endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polirate_core::PaginationParams;

use crate::auth::AuthUser;
use crate::db::repos::{Bookmark, BookmarkRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, ValidUuid};
use crate::http::response::{created, ok, page, ApiResponse};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct BookmarkRequest {
    pub politician_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BookmarkState {
    pub politician_id: Uuid,
    pub bookmarked: bool,
}

/// GET /api/bookmarks
async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<ApiResponse<Vec<Bookmark>>>, ApiError> {
    let result = BookmarkRepo::new(&state.pool)
        .list(user.id, params.pagination())
        .await?;
    Ok(page(result))
}

/// POST /api/bookmarks
async fn add_bookmark(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<BookmarkRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookmarkState>>), ApiError> {
    BookmarkRepo::new(&state.pool)
        .add(&user, req.politician_id)
        .await?;
    Ok(created(BookmarkState {
        politician_id: req.politician_id,
        bookmarked: true,
    }))
}

/// DELETE /api/bookmarks/{politician_id}
async fn remove_bookmark(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(politician_id): ValidUuid,
) -> Result<Json<ApiResponse<BookmarkState>>, ApiError> {
    BookmarkRepo::new(&state.pool)
        .remove(user.id, politician_id)
        .await?;
    Ok(ok(BookmarkState {
        politician_id,
        bookmarked: false,
    }))
}

/// Bookmark routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/bookmarks", get(list_bookmarks).post(add_bookmark))
        .route("/api/bookmarks/{politician_id}", delete(remove_bookmark))
}
