//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use polirate_core::ValidationError;

use super::error::ApiError;
use super::server::AppState;
use crate::auth::{AuthError, AuthUser};

/// JSON body whose rejections use the API error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections use the API error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation(ValidationError::Empty { field: "id" }))?;

        let uuid = Uuid::parse_str(&id).map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "invalid UUID format",
            })
        })?;

        Ok(Self(uuid))
    }
}

/// Verify the Authorization header if present.
///
/// A missing header is `Ok(None)`; a present but bad one is an error.
fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = value.to_str().map_err(|_| AuthError::Malformed)?;
    state.jwt.verify_header(header).map(Some)
}

/// Required authentication
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?.ok_or_else(|| AuthError::Missing.into())
    }
}

/// Optional authentication, for endpoints that personalize public data
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state)?))
    }
}

/// Caller holding the service role
#[derive(Debug, Clone)]
pub struct ServiceUser(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for ServiceUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_service() {
            tracing::warn!(user_id = %user.id, "service endpoint called without service role");
            return Err(ApiError::forbidden("service role required"));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{token_for, SECRET};
    use crate::auth::SERVICE_ROLE;
    use axum::http::Request;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::for_tests(SECRET))
    }

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let user = MaybeUser::from_request_parts(&mut parts(None), &state())
            .await
            .unwrap();
        assert!(user.0.is_none());

        let err = AuthUser::from_request_parts(&mut parts(None), &state())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn bad_token_rejected_even_when_optional() {
        let err = MaybeUser::from_request_parts(&mut parts(Some("Bearer nope")), &state())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn valid_token_extracts_user() {
        let id = Uuid::new_v4();
        let header = format!("Bearer {}", token_for(id, None));
        let user = AuthUser::from_request_parts(&mut parts(Some(&header)), &state())
            .await
            .unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn service_role_enforced() {
        let header = format!("Bearer {}", token_for(Uuid::new_v4(), None));
        let err = ServiceUser::from_request_parts(&mut parts(Some(&header)), &state())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));

        let header = format!("Bearer {}", token_for(Uuid::new_v4(), Some(SERVICE_ROLE)));
        assert!(ServiceUser::from_request_parts(&mut parts(Some(&header)), &state())
            .await
            .is_ok());
    }
}
