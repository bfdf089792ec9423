//! Report purchase checkout endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polirate_core::report::VerificationCode;
use polirate_core::{
    bounded_text, BuyerType, Email, PaginationParams, PurchaseStatus, ValidationError,
};

use super::optional_text;
use crate::auth::AuthUser;
use crate::db::repos::{NewPurchase, PaymentInput, PurchaseQuote, ReportPurchase, ReportRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, ServiceUser, ValidUuid};
use crate::http::response::{created, ok, page, ApiResponse};
use crate::http::server::AppState;

const MAX_NAME_LEN: usize = 100;
const MAX_METHOD_LEN: usize = 50;
const MAX_REFERENCE_LEN: usize = 200;
const MAX_URL_LEN: usize = 2_048;

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub politician_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub politician_id: Uuid,
    pub buyer_type: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub organization: Option<String>,
}

impl CreatePurchaseRequest {
    fn validate(self) -> Result<NewPurchase, ValidationError> {
        let buyer_type: BuyerType = self.buyer_type.parse()?;
        let organization = optional_text("organization", self.organization, MAX_NAME_LEN)?;
        if buyer_type.requires_organization() && organization.is_none() {
            return Err(ValidationError::Empty {
                field: "organization",
            });
        }

        Ok(NewPurchase {
            politician_id: self.politician_id,
            buyer_type,
            buyer_name: bounded_text("buyer_name", &self.buyer_name, 1, MAX_NAME_LEN)?,
            buyer_email: Email::new(&self.buyer_email)?,
            organization,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: i64,
    pub method: String,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub report_url: String,
}

/// Purchase with the checkout step the buyer is on
#[derive(Debug, Serialize)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: ReportPurchase,
    pub step: u8,
    /// Set when a verification code was just issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_sent: Option<bool>,
}

impl From<ReportPurchase> for PurchaseView {
    fn from(purchase: ReportPurchase) -> Self {
        let step = purchase.status().map(|s| s.step()).unwrap_or(0);
        Self {
            purchase,
            step,
            code_sent: None,
        }
    }
}

/// Hand the code to the configured sender. Delivery failures are logged and
/// reported as `code_sent: false`; the buyer can ask for a resend.
async fn deliver_code(state: &AppState, purchase: ReportPurchase, code: &VerificationCode) -> PurchaseView {
    let sent = match state
        .codes
        .send(&purchase.buyer_email, purchase.id, &code.code)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(purchase_id = %purchase.id, error = %e, "verification code delivery failed");
            false
        }
    };

    PurchaseView {
        code_sent: Some(sent),
        ..PurchaseView::from(purchase)
    }
}

/// GET /api/report-purchase/count?politician_id=
async fn quote(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<QuoteQuery>,
) -> Result<Json<ApiResponse<PurchaseQuote>>, ApiError> {
    let quote = ReportRepo::new(&state.pool, state.prices)
        .quote(user.id, query.politician_id)
        .await?;
    Ok(ok(quote))
}

/// GET /api/report-purchase
async fn list_purchases(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PaginationParams>,
    ApiQuery(query): ApiQuery<PurchaseListQuery>,
) -> Result<Json<ApiResponse<Vec<PurchaseView>>>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(PurchaseStatus::parse(s).ok_or_else(|| ValidationError::InvalidVariant {
            field: "status",
            value: s.to_owned(),
        })?),
    };

    let result = ReportRepo::new(&state.pool, state.prices)
        .list_for_buyer(user.id, status, params.pagination())
        .await?;
    Ok(page(result.map(PurchaseView::from)))
}

/// POST /api/report-purchase
async fn create_purchase(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PurchaseView>>), ApiError> {
    let new = req.validate()?;
    let (purchase, code) = ReportRepo::new(&state.pool, state.prices)
        .create(&user, new)
        .await?;

    Ok(created(deliver_code(&state, purchase, &code).await))
}

/// GET /api/report-purchase/{id}
async fn get_purchase(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<PurchaseView>>, ApiError> {
    let purchase = ReportRepo::new(&state.pool, state.prices)
        .get(&user, id)
        .await?;
    Ok(ok(purchase.into()))
}

/// POST /api/report-purchase/{id}/verify
async fn verify(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<ApiResponse<PurchaseView>>, ApiError> {
    let code = req.code.trim();
    if code.is_empty() {
        return Err(ValidationError::Empty { field: "code" }.into());
    }

    let purchase = ReportRepo::new(&state.pool, state.prices)
        .verify(&user, id, code)
        .await?;
    Ok(ok(purchase.into()))
}

/// POST /api/report-purchase/{id}/resend
async fn resend(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<PurchaseView>>, ApiError> {
    let (purchase, code) = ReportRepo::new(&state.pool, state.prices)
        .resend_code(&user, id)
        .await?;
    Ok(ok(deliver_code(&state, purchase, &code).await))
}

/// POST /api/report-purchase/{id}/payment
async fn pay(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> Result<Json<ApiResponse<PurchaseView>>, ApiError> {
    if req.amount <= 0 {
        return Err(ValidationError::OutOfRange {
            field: "amount",
            min: 1,
            max: i64::MAX,
        }
        .into());
    }
    let payment = PaymentInput {
        amount: req.amount,
        method: bounded_text("method", &req.method, 1, MAX_METHOD_LEN)?,
        reference: optional_text("reference", req.reference, MAX_REFERENCE_LEN)?,
    };

    let purchase = ReportRepo::new(&state.pool, state.prices)
        .pay(&user, id, payment)
        .await?;
    Ok(ok(purchase.into()))
}

/// POST /api/report-purchase/{id}/complete (service role)
async fn complete(
    State(state): State<Arc<AppState>>,
    _service: ServiceUser,
    ValidUuid(id): ValidUuid,
    ApiJson(req): ApiJson<CompleteRequest>,
) -> Result<Json<ApiResponse<PurchaseView>>, ApiError> {
    let url = bounded_text("report_url", &req.report_url, 1, MAX_URL_LEN)?;
    let purchase = ReportRepo::new(&state.pool, state.prices)
        .complete(id, &url)
        .await?;
    Ok(ok(purchase.into()))
}

/// POST /api/report-purchase/{id}/cancel
async fn cancel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<PurchaseView>>, ApiError> {
    let purchase = ReportRepo::new(&state.pool, state.prices)
        .cancel(&user, id)
        .await?;
    Ok(ok(purchase.into()))
}

/// Report purchase routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/report-purchase",
            get(list_purchases).post(create_purchase),
        )
        .route("/api/report-purchase/count", get(quote))
        .route("/api/report-purchase/{id}", get(get_purchase))
        .route("/api/report-purchase/{id}/verify", post(verify))
        .route("/api/report-purchase/{id}/resend", post(resend))
        .route("/api/report-purchase/{id}/payment", post(pay))
        .route("/api/report-purchase/{id}/complete", post(complete))
        .route("/api/report-purchase/{id}/cancel", post(cancel))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(buyer_type: &str, organization: Option<&str>) -> CreatePurchaseRequest {
        CreatePurchaseRequest {
            politician_id: Uuid::new_v4(),
            buyer_type: buyer_type.into(),
            buyer_name: "Kim".into(),
            buyer_email: "Kim@Example.com".into(),
            organization: organization.map(str::to_owned),
        }
    }

    #[test]
    fn organization_required_for_groups() {
        assert!(request("individual", None).validate().is_ok());
        assert!(matches!(
            request("party", None).validate(),
            Err(ValidationError::Empty {
                field: "organization"
            })
        ));
        assert!(request("party", Some("Green Party")).validate().is_ok());
    }

    #[test]
    fn email_normalized() {
        let new = request("individual", None).validate().unwrap();
        assert_eq!(new.buyer_email.as_str(), "kim@example.com");
    }

    #[test]
    fn unknown_buyer_type() {
        assert!(matches!(
            request("corporation", None).validate(),
            Err(ValidationError::InvalidVariant { .. })
        ));
    }
}
