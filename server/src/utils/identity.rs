//! Caller identity.
//!
//! Authentication happens upstream (gateway or auth middleware), which
//! forwards the verified user id in [`USER_ID_HEADER`]. Handlers only ever
//! see a parsed [`CallerId`].

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("Missing caller identity".to_string()))?;

        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(CallerId)
            .ok_or_else(|| AppError::AuthError("Invalid caller identity".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<CallerId, AppError> {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CallerId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_parses_positive_user_id() {
        assert_eq!(extract(Some("42")).await.unwrap(), CallerId(42));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_identity_is_rejected() {
        assert!(matches!(extract(None).await, Err(AppError::AuthError(_))));
        assert!(matches!(extract(Some("abc")).await, Err(AppError::AuthError(_))));
        assert!(matches!(extract(Some("0")).await, Err(AppError::AuthError(_))));
    }
}
