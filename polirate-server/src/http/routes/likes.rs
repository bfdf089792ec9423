//! Like endpoints for ratings and comments

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use polirate_core::{LikeTarget, ValidationError};

use crate::auth::AuthUser;
use crate::db::repos::{LikeRepo, LikeState};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, MaybeUser};
use crate::http::response::{created, ok, ApiResponse};
use crate::http::server::AppState;

/// Most ids accepted by one status lookup
const MAX_STATUS_IDS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub target_type: LikeTarget,
    pub target_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LikeStatusQuery {
    pub target_type: String,
    /// Comma-separated ids
    pub ids: String,
}

fn parse_ids(raw: &str) -> Result<Vec<Uuid>, ValidationError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s).map_err(|_| ValidationError::InvalidFormat {
                field: "ids",
                reason: "invalid UUID format",
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(ValidationError::Empty { field: "ids" });
    }
    if ids.len() > MAX_STATUS_IDS {
        return Err(ValidationError::OutOfRange {
            field: "ids",
            min: 1,
            max: MAX_STATUS_IDS as i64,
        });
    }
    Ok(ids)
}

/// POST /api/likes
async fn like(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<LikeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LikeState>>), ApiError> {
    let like = LikeRepo::new(&state.pool)
        .like(&user, req.target_type, req.target_id)
        .await?;
    Ok(created(like))
}

/// DELETE /api/likes
async fn unlike(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<LikeRequest>,
) -> Result<Json<ApiResponse<LikeState>>, ApiError> {
    let like = LikeRepo::new(&state.pool)
        .unlike(&user, req.target_type, req.target_id)
        .await?;
    Ok(ok(like))
}

/// GET /api/likes/status?target_type=comment&ids=a,b,c
async fn status(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<LikeStatusQuery>,
) -> Result<Json<ApiResponse<Vec<LikeState>>>, ApiError> {
    let target: LikeTarget = query.target_type.parse()?;
    let ids = parse_ids(&query.ids)?;

    let states = LikeRepo::new(&state.pool)
        .status(viewer.id(), target, &ids)
        .await?;
    Ok(ok(states))
}

/// Like routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/likes", post(like).delete(unlike))
        .route("/api/likes/status", get(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parsing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(parse_ids(&format!("{a}, {b},")).unwrap(), vec![a, b]);
        assert!(parse_ids("").is_err());
        assert!(parse_ids("not-a-uuid").is_err());

        let many = (0..=MAX_STATUS_IDS)
            .map(|_| Uuid::new_v4().to_string())
            .collect::<Vec<_>>()
            .join(",");
        assert!(matches!(
            parse_ids(&many),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
