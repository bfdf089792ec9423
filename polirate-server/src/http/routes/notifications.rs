//! Notification inbox endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polirate_core::{bounded_text, NotificationDraft, NotificationKind, PaginationParams};

use super::optional_text;
use crate::auth::AuthUser;
use crate::db::repos::{Notification, NotificationFilter, NotificationRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, ServiceUser, ValidUuid};
use crate::http::response::{created, ok, page_with, ApiResponse};
use crate::http::server::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_BODY_LEN: usize = 1_000;
const MAX_LINK_LEN: usize = 2_048;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    /// RFC 3339; only newer notifications are returned
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ReadAll {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedNotification {
    pub id: Uuid,
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub kind: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

impl CreateNotificationRequest {
    fn into_draft(self) -> Result<NotificationDraft, ApiError> {
        let kind = match self.kind.as_deref() {
            Some(k) => k.parse()?,
            None => NotificationKind::System,
        };
        Ok(NotificationDraft {
            recipient_id: self.recipient_id,
            sender_id: self.sender_id,
            kind,
            title: bounded_text("title", &self.title, 1, MAX_TITLE_LEN)?,
            body: optional_text("body", self.body, MAX_BODY_LEN)?,
            link: optional_text("link", self.link, MAX_LINK_LEN)?,
        })
    }
}

/// GET /api/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PaginationParams>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> Result<Json<ApiResponse<NotificationList>>, ApiError> {
    let repo = NotificationRepo::new(&state.pool);
    let filter = NotificationFilter {
        unread_only: query.unread_only,
        since: query.since,
    };

    let result = repo.list(user.id, filter, params.pagination()).await?;
    let unread_count = repo.unread_count(user.id).await?;

    let meta = result.meta();
    Ok(page_with(
        meta,
        NotificationList {
            notifications: result.items,
            unread_count,
        },
    ))
}

/// GET /api/notifications/unread-count
async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UnreadCount>>, ApiError> {
    let unread_count = NotificationRepo::new(&state.pool)
        .unread_count(user.id)
        .await?;
    Ok(ok(UnreadCount { unread_count }))
}

/// POST /api/notifications (service role)
async fn create_notification(
    State(state): State<Arc<AppState>>,
    _service: ServiceUser,
    ApiJson(req): ApiJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Notification>>), ApiError> {
    let draft = req.into_draft()?;
    let notification = NotificationRepo::new(&state.pool).create(&draft).await?;
    Ok(created(notification))
}

/// PATCH /api/notifications/{id}/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<Notification>>, ApiError> {
    let notification = NotificationRepo::new(&state.pool)
        .mark_read(user.id, id)
        .await?;
    Ok(ok(notification))
}

/// POST /api/notifications/read-all
async fn read_all(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<ReadAll>>, ApiError> {
    let updated = NotificationRepo::new(&state.pool)
        .mark_all_read(user.id)
        .await?;
    Ok(ok(ReadAll { updated }))
}

/// DELETE /api/notifications/{id}
async fn delete_notification(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ApiResponse<DeletedNotification>>, ApiError> {
    NotificationRepo::new(&state.pool).delete(user.id, id).await?;
    Ok(ok(DeletedNotification { id, deleted: true }))
}

/// Notification routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", post(read_all))
        .route("/api/notifications/{id}/read", patch(mark_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: Option<&str>, title: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            recipient_id: Uuid::new_v4(),
            sender_id: None,
            kind: kind.map(str::to_owned),
            title: title.into(),
            body: Some("  ".into()),
            link: None,
        }
    }

    #[test]
    fn draft_defaults_to_system() {
        let draft = request(None, "Maintenance tonight").into_draft().unwrap();
        assert_eq!(draft.kind, NotificationKind::System);
        assert_eq!(draft.body, None);
    }

    #[test]
    fn draft_validation() {
        assert!(request(Some("follow"), "x").into_draft().is_ok());
        assert!(request(Some("spam"), "x").into_draft().is_err());
        assert!(request(None, "   ").into_draft().is_err());
    }
}
