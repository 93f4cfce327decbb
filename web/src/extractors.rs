//! Authentication extractors.
//!
//! - [`BearerToken`]: the raw `Authorization: Bearer <token>` value
//! - [`SessionUser`]: a live session looked up from the token
//! - [`RequireStaff`]: a session whose role is not `guest`
//!
//! ```ignore
//! async fn list_all(staff: RequireStaff, State(state): State<AppState>) -> ... {
//!     // staff.actor.role.is_staff() holds here
//! }
//! ```

use crate::error::AppError;
use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use hotel_core::Actor;
use uuid::Uuid;

/// Token from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Caller with a valid, unexpired session.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser {
    /// Who is calling
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let token = Uuid::parse_str(&bearer.0)
            .map_err(|_| AppError::unauthorized("Invalid session token format"))?;

        let session = state
            .store
            .session(token, state.clock.now())
            .await?
            .ok_or_else(|| AppError::unauthorized("Session expired or unknown"))?;

        let actor = session.actor();
        tracing::Span::current().record("user_id", tracing::field::display(actor.user_id));
        Ok(Self { actor })
    }
}

/// Caller with a staff role (anything but `guest`).
#[derive(Debug, Clone, Copy)]
pub struct RequireStaff {
    /// Who is calling
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser { actor } = SessionUser::from_request_parts(parts, state).await?;
        if !actor.role.is_staff() {
            tracing::warn!(user_id = %actor.user_id, "Guest attempted a staff-only operation");
            return Err(AppError::forbidden("Staff access required"));
        }
        Ok(Self { actor })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn bearer(header: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_bearer_token_parsing() {
        assert_eq!(bearer(Some("Bearer abc")).await.unwrap().0, "abc");
        assert_eq!(
            bearer(None).await.unwrap_err().status(),
            axum::http::StatusCode::UNAUTHORIZED
        );
        assert!(bearer(Some("Basic abc")).await.is_err());
        assert!(bearer(Some("Bearer ")).await.is_err());
    }
}
