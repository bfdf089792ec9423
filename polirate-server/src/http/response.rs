//! Success envelopes
//!
//! `{"success": true, "data": ..., "pagination": {...}}`, with `pagination`
//! only on list responses.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use polirate_core::{PageMeta, Paginated};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        pagination: None,
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

pub fn page<T: Serialize>(page: Paginated<T>) -> Json<ApiResponse<Vec<T>>> {
    let meta = page.meta();
    Json(ApiResponse {
        success: true,
        data: page.items,
        pagination: Some(meta),
    })
}

/// List envelope whose `data` carries extra fields next to the items.
pub fn page_with<D: Serialize>(meta: PageMeta, data: D) -> Json<ApiResponse<D>> {
    Json(ApiResponse {
        success: true,
        data,
        pagination: Some(meta),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polirate_core::Pagination;

    #[test]
    fn ok_has_no_pagination() {
        let Json(body) = ok(42);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 42}));
    }

    #[test]
    fn page_carries_meta() {
        let paged = Pagination::new(2, 10).wrap(vec!["a", "b"], 12);
        let Json(body) = page(paged);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["data"], serde_json::json!(["a", "b"]));
        assert_eq!(json["pagination"]["page"], 2);
        assert_eq!(json["pagination"]["total"], 12);
        assert_eq!(json["pagination"]["total_pages"], 2);
        assert_eq!(json["pagination"]["has_next"], false);
        assert_eq!(json["pagination"]["has_prev"], true);
    }
}
