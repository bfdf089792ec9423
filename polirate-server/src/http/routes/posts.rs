//! Community post endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polirate_core::{PaginationParams, PostCategory, PostContent, PostSort, PostTitle, Sort};

use crate::auth::AuthUser;
use crate::db::repos::{NewPost, Post, PostFilter, PostPatch, PostRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, ValidUuid};
use crate::http::response::{created, ok, page, ApiResponse};
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub category: Option<String>,
    pub politician_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub politician_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedPost {
    pub id: Uuid,
    pub deleted: bool,
}

fn parse_category(raw: Option<&str>) -> Result<Option<PostCategory>, ApiError> {
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .transpose()?)
}

/// GET /api/posts
async fn list_posts(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<PaginationParams>,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> Result<Json<ApiResponse<Vec<Post>>>, ApiError> {
    let sort = Sort::<PostSort>::parse(params.sort_by.as_deref(), params.sort_order.as_deref())?;
    let filter = PostFilter {
        category: parse_category(query.category.as_deref())?,
        politician_id: query.politician_id,
        author_id: query.author_id,
        q: query.q,
    };

    let result = PostRepo::new(&state.pool)
        .list(&filter, sort, params.pagination())
        .await?;
    Ok(page(result))
}

/// GET /api/posts/{id} - counts a view
async fn get_post(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<Post>>, ApiError> {
    let post = PostRepo::new(&state.pool).view(id).await?;
    Ok(ok(post))
}

/// POST /api/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Post>>), ApiError> {
    let new = NewPost {
        title: PostTitle::new(&req.title)?,
        content: PostContent::new(&req.content)?,
        category: parse_category(req.category.as_deref())?.unwrap_or_default(),
        politician_id: req.politician_id,
    };

    let post = PostRepo::new(&state.pool).create(&user, new).await?;
    Ok(created(post))
}

/// PATCH /api/posts/{id}
async fn update_post(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> Result<Json<ApiResponse<Post>>, ApiError> {
    let patch = PostPatch {
        title: req.title.as_deref().map(PostTitle::new).transpose()?,
        content: req.content.as_deref().map(PostContent::new).transpose()?,
        category: parse_category(req.category.as_deref())?,
    };

    let post = PostRepo::new(&state.pool).update(&user, id, patch).await?;
    Ok(ok(post))
}

/// DELETE /api/posts/{id}
async fn delete_post(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<DeletedPost>>, ApiError> {
    PostRepo::new(&state.pool).delete(&user, id).await?;
    Ok(ok(DeletedPost { id, deleted: true }))
}

/// Post routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(parse_category(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_category(Some("debate")).unwrap(),
            Some(PostCategory::Debate)
        );
        assert!(parse_category(Some("gossip")).is_err());
    }
}
