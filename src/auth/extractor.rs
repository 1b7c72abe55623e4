use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tracing::warn;

use crate::{error::ApiError, state::AppState, users::repo::User};

/// Extracts the authenticated user from a bearer token.
#[derive(Debug)]
pub struct CurrentUser(pub User);

/// Like [`CurrentUser`], but additionally requires the staff flag.
pub struct StaffUser(pub User);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or(ApiError::Unauthorized("missing or malformed Authorization header"))?;

        let user_id = state
            .tokens
            .resolve(token)
            .await?
            .ok_or_else(|| {
                warn!("unknown token presented");
                ApiError::Unauthorized("invalid token")
            })?;

        let user = User::find_by_id(&state.db, user_id)
            .await?
            .ok_or(ApiError::Unauthorized("invalid token"))?;

        if !user.is_active {
            warn!(user_id = %user.id, "inactive user presented a valid token");
            return Err(ApiError::Unauthorized("user inactive or deleted"));
        }

        Ok(CurrentUser(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ApiError::Forbidden);
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::Request;

    #[test]
    fn bearer_token_parses_both_prefix_casings() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(axum::http::header::AUTHORIZATION, "bearer xyz".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("xyz"));
    }

    #[test]
    fn bearer_token_rejects_missing_and_foreign_schemes() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn missing_header_is_rejected_before_any_lookup() {
        let state = AppState::fake();
        let (mut parts, _) = Request::builder().uri("/api/recipes").body(()).unwrap().into_parts();
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let state = AppState::fake();
        let (mut parts, _) = Request::builder()
            .uri("/api/recipes")
            .header(axum::http::header::AUTHORIZATION, "Bearer not-a-real-token")
            .body(())
            .unwrap()
            .into_parts();
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
