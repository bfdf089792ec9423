//! Route handlers organized by resource

pub mod bookmarks;
pub mod comments;
pub mod health;
pub mod likes;
pub mod notifications;
pub mod politicians;
pub mod posts;
pub mod ratings;
pub mod reports;
pub mod users;

use polirate_core::{bounded_text, ValidationError};

/// Trim an optional free-text field; blank input becomes `None`.
pub(crate) fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(s) => {
            let trimmed = bounded_text(field, &s, 0, max)?;
            Ok((!trimmed.is_empty()).then_some(trimmed))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::tests::{token_for, SECRET};
    use crate::http::server::{build_router, AppState};

    fn app() -> Router {
        build_router(Arc::new(AppState::for_tests(SECRET)))
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn optional_text_blanks() {
        assert_eq!(optional_text("bio", None, 10).unwrap(), None);
        assert_eq!(optional_text("bio", Some("   ".into()), 10).unwrap(), None);
        assert_eq!(
            optional_text("bio", Some(" hi ".into()), 10).unwrap(),
            Some("hi".into())
        );
        assert!(optional_text("bio", Some("x".repeat(11)), 10).is_err());
    }

    #[tokio::test]
    async fn health_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn comment_requires_token() {
        let body = format!(r#"{{"post_id":"{}","content":"hi"}}"#, Uuid::new_v4());
        let response = app()
            .oneshot(json_request("POST", "/api/comments", None, &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "unauthorized");
    }

    #[tokio::test]
    async fn empty_comment_rejected_before_db() {
        let token = token_for(Uuid::new_v4(), None);
        let body = format!(r#"{{"post_id":"{}","content":"   "}}"#, Uuid::new_v4());
        let response = app()
            .oneshot(json_request("POST", "/api/comments", Some(&token), &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "validation_error");
    }

    #[tokio::test]
    async fn bad_uuid_path() {
        let response = app()
            .oneshot(
                Request::get("/api/politicians/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_like_target() {
        let token = token_for(Uuid::new_v4(), None);
        let body = format!(r#"{{"target_type":"politician","target_id":"{}"}}"#, Uuid::new_v4());
        let response = app()
            .oneshot(json_request("POST", "/api/likes", Some(&token), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn service_endpoint_forbidden_for_users() {
        let token = token_for(Uuid::new_v4(), Some("authenticated"));
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/politicians",
                Some(&token),
                r#"{"name":"Hong Gildong"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], "forbidden");
    }

    #[tokio::test]
    async fn malformed_json() {
        let token = token_for(Uuid::new_v4(), None);
        let response = app()
            .oneshot(json_request("POST", "/api/posts", Some(&token), "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "bad_request");
    }

    #[tokio::test]
    async fn malformed_bearer_on_public_route() {
        let response = app()
            .oneshot(
                Request::get(format!("/api/comments?post_id={}", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
