//! Comment endpoints
//!
//! Comments attach to a post or a politician; replies nest one level.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use polirate_core::{CommentContent, CommentSort, CommentTarget, CommentThread, PaginationParams, Sort};

use crate::auth::AuthUser;
use crate::db::repos::{Comment, CommentRepo, DeleteOutcome};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, MaybeUser, ValidUuid};
use crate::http::response::{created, ok, page, ApiResponse};
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CommentQuery {
    pub post_id: Option<Uuid>,
    pub politician_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: Option<Uuid>,
    pub politician_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// GET /api/comments?post_id=|politician_id=
async fn list_comments(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    ApiQuery(params): ApiQuery<PaginationParams>,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> Result<Json<ApiResponse<Vec<CommentThread<Comment>>>>, ApiError> {
    let target = CommentTarget::from_ids(query.post_id, query.politician_id)?;
    let sort = Sort::<CommentSort>::parse(params.sort_by.as_deref(), params.sort_order.as_deref())?;

    let result = CommentRepo::new(&state.pool)
        .list(target, sort, params.pagination(), viewer.id())
        .await?;
    Ok(page(result))
}

/// POST /api/comments
async fn create_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), ApiError> {
    let target = CommentTarget::from_ids(req.post_id, req.politician_id)?;
    let content = CommentContent::new(&req.content)?;

    let comment = CommentRepo::new(&state.pool)
        .create(&user, target, req.parent_id, content)
        .await?;
    Ok(created(comment))
}

/// PATCH /api/comments/{id}
async fn update_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> Result<Json<ApiResponse<Comment>>, ApiError> {
    let content = CommentContent::new(&req.content)?;
    let comment = CommentRepo::new(&state.pool)
        .update(&user, id, content)
        .await?;
    Ok(ok(comment))
}

/// DELETE /api/comments/{id}
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<DeleteOutcome>>, ApiError> {
    let outcome = CommentRepo::new(&state.pool).delete(&user, id).await?;
    Ok(ok(outcome))
}

/// Comment routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/comments", get(list_comments).post(create_comment))
        .route(
            "/api/comments/{id}",
            patch(update_comment).delete(delete_comment),
        )
}
