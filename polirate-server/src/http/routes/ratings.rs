//! Citizen rating endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polirate_core::evaluation::rating_comment;
use polirate_core::{PaginationParams, RatingScore, RatingSort, Sort};

use crate::auth::AuthUser;
use crate::db::repos::{Rating, RatingRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, MaybeUser, ValidUuid};
use crate::http::response::{ok, page, ApiResponse};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub score: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub politician_id: Uuid,
    pub deleted: bool,
}

/// GET /api/politicians/{id}/ratings
async fn list_ratings(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    ValidUuid(politician_id): ValidUuid,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<ApiResponse<Vec<Rating>>>, ApiError> {
    let sort = Sort::<RatingSort>::parse(params.sort_by.as_deref(), params.sort_order.as_deref())?;
    let result = RatingRepo::new(&state.pool)
        .list(politician_id, sort, params.pagination(), viewer.id())
        .await?;
    Ok(page(result))
}

/// GET /api/politicians/{id}/ratings/me
async fn my_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(politician_id): ValidUuid,
) -> Result<Json<ApiResponse<Option<Rating>>>, ApiError> {
    let rating = RatingRepo::new(&state.pool)
        .mine(user.id, politician_id)
        .await?;
    Ok(ok(rating))
}

/// PUT /api/politicians/{id}/ratings - 201 on first rating, 200 on update
async fn put_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(politician_id): ValidUuid,
    ApiJson(req): ApiJson<RatingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Rating>>), ApiError> {
    let score = RatingScore::new(req.score)?;
    let comment = rating_comment(req.comment.as_deref())?;

    let (rating, created) = RatingRepo::new(&state.pool)
        .upsert(&user, politician_id, score, comment)
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ok(rating)))
}

/// DELETE /api/politicians/{id}/ratings
async fn delete_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(politician_id): ValidUuid,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    RatingRepo::new(&state.pool)
        .delete(&user, politician_id)
        .await?;
    Ok(ok(Deleted {
        politician_id,
        deleted: true,
    }))
}

/// Rating routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/politicians/{id}/ratings",
            get(list_ratings).put(put_rating).delete(delete_rating),
        )
        .route("/api/politicians/{id}/ratings/me", get(my_rating))
}
