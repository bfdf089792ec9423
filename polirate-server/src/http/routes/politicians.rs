//! Politician directory and AI evaluation endpoints

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use polirate_core::{
    bounded_text, EvaluationCategory, EvaluationScore, PaginationParams, PoliticianSort, Sort,
    ValidationError,
};

use super::optional_text;
use crate::db::repos::{
    EvaluationInput, EvaluationRepo, EvaluationSummary, NewPolitician, PoliticianDetail,
    PoliticianFilter, PoliticianPatch, PoliticianRepo, PoliticianSummary,
};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, MaybeUser, ServiceUser, ValidUuid};
use crate::http::response::{created, ok, page, ApiResponse};
use crate::http::server::AppState;

const MAX_NAME_LEN: usize = 100;
const MAX_FIELD_LEN: usize = 100;
const MAX_BIO_LEN: usize = 5_000;
const MAX_URL_LEN: usize = 2_048;

#[derive(Debug, Default, Deserialize)]
pub struct PoliticianQuery {
    pub q: Option<String>,
    pub party: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePoliticianRequest {
    pub name: String,
    pub party: Option<String>,
    pub region: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePoliticianRequest {
    pub name: Option<String>,
    pub party: Option<String>,
    pub region: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryScoreRequest {
    pub category: String,
    pub score: f64,
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    /// Model that produced the scores
    pub model: String,
    pub scores: Vec<CategoryScoreRequest>,
}

impl EvaluationRequest {
    fn validate(self) -> Result<(String, Vec<EvaluationInput>), ValidationError> {
        let model = bounded_text("model", &self.model, 1, MAX_FIELD_LEN)?;
        if self.scores.is_empty() {
            return Err(ValidationError::Empty { field: "scores" });
        }

        let mut seen = HashSet::new();
        let mut inputs = Vec::with_capacity(self.scores.len());
        for s in self.scores {
            let category: EvaluationCategory = s.category.parse()?;
            if !seen.insert(category) {
                return Err(ValidationError::InvalidFormat {
                    field: "scores",
                    reason: "each category may appear once",
                });
            }
            inputs.push(EvaluationInput {
                category,
                score: EvaluationScore::new(s.score)?,
                summary: optional_text("summary", s.summary, MAX_BIO_LEN)?,
            });
        }
        Ok((model, inputs))
    }
}

/// GET /api/politicians
async fn list_politicians(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<PaginationParams>,
    ApiQuery(query): ApiQuery<PoliticianQuery>,
) -> Result<Json<ApiResponse<Vec<PoliticianSummary>>>, ApiError> {
    let sort = Sort::<PoliticianSort>::parse(params.sort_by.as_deref(), params.sort_order.as_deref())?;
    let filter = PoliticianFilter {
        q: query.q,
        party: query.party.filter(|s| !s.trim().is_empty()),
        region: query.region.filter(|s| !s.trim().is_empty()),
    };

    let result = PoliticianRepo::new(&state.pool)
        .list(&filter, sort, params.pagination())
        .await?;
    Ok(page(result))
}

/// GET /api/politicians/{id}
async fn get_politician(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<PoliticianDetail>>, ApiError> {
    let politician = PoliticianRepo::new(&state.pool).get(id, viewer.id()).await?;
    Ok(ok(politician))
}

/// POST /api/politicians (service role)
async fn create_politician(
    State(state): State<Arc<AppState>>,
    _service: ServiceUser,
    ApiJson(req): ApiJson<CreatePoliticianRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PoliticianDetail>>), ApiError> {
    let new = NewPolitician {
        name: bounded_text("name", &req.name, 1, MAX_NAME_LEN)?,
        party: optional_text("party", req.party, MAX_FIELD_LEN)?,
        region: optional_text("region", req.region, MAX_FIELD_LEN)?,
        position: optional_text("position", req.position, MAX_FIELD_LEN)?,
        bio: optional_text("bio", req.bio, MAX_BIO_LEN)?,
        image_url: optional_text("image_url", req.image_url, MAX_URL_LEN)?,
    };

    let politician = PoliticianRepo::new(&state.pool).create(new).await?;
    Ok(created(politician))
}

/// PATCH /api/politicians/{id} (service role)
async fn update_politician(
    State(state): State<Arc<AppState>>,
    _service: ServiceUser,
    ValidUuid(id): ValidUuid,
    ApiJson(req): ApiJson<UpdatePoliticianRequest>,
) -> Result<Json<ApiResponse<PoliticianDetail>>, ApiError> {
    let patch = PoliticianPatch {
        name: req
            .name
            .map(|n| bounded_text("name", &n, 1, MAX_NAME_LEN))
            .transpose()?,
        party: optional_text("party", req.party, MAX_FIELD_LEN)?,
        region: optional_text("region", req.region, MAX_FIELD_LEN)?,
        position: optional_text("position", req.position, MAX_FIELD_LEN)?,
        bio: optional_text("bio", req.bio, MAX_BIO_LEN)?,
        image_url: optional_text("image_url", req.image_url, MAX_URL_LEN)?,
    };

    let politician = PoliticianRepo::new(&state.pool).update(id, patch).await?;
    Ok(ok(politician))
}

/// GET /api/politicians/{id}/evaluation
async fn get_evaluation(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<EvaluationSummary>>, ApiError> {
    let summary = EvaluationRepo::new(&state.pool).for_politician(id).await?;
    Ok(ok(summary))
}

/// PUT /api/politicians/{id}/evaluation (service role)
async fn put_evaluation(
    State(state): State<Arc<AppState>>,
    _service: ServiceUser,
    ValidUuid(id): ValidUuid,
    ApiJson(req): ApiJson<EvaluationRequest>,
) -> Result<Json<ApiResponse<EvaluationSummary>>, ApiError> {
    let (model, inputs) = req.validate()?;

    // Make sure the politician exists before writing scores
    PoliticianRepo::new(&state.pool).name(id).await?;

    let summary = EvaluationRepo::new(&state.pool)
        .upsert(id, &model, &inputs)
        .await?;
    Ok(ok(summary))
}

/// Politician routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/politicians", get(list_politicians).post(create_politician))
        .route("/api/politicians/{id}", get(get_politician).patch(update_politician))
        .route(
            "/api/politicians/{id}/evaluation",
            get(get_evaluation).put(put_evaluation),
        )
}
