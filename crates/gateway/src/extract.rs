//! Request extractors.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query};
use axum::http::request::Parts;
use enhancer_core::{Caller, Identity};
use std::convert::Infallible;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the anonymous session id.
pub const SESSION_ID_HEADER: &str = "x-session-id";
/// Header carrying a caller-supplied trace id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON body whose rejections become 400 validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections become 400 validation errors.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Who is calling, and under which trace id.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub caller: Caller,
    pub trace_id: String,
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller {
            identity: Identity::from_optional(header(parts, USER_ID_HEADER)),
            session_id: header(parts, SESSION_ID_HEADER).map(str::to_string),
        };
        let trace_id = header(parts, REQUEST_ID_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(Self { caller, trace_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn meta(request: Request<()>) -> RequestMeta {
        let (mut parts, _) = request.into_parts();
        RequestMeta::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_headers_build_caller() {
        let m = meta(
            Request::builder()
                .header("X-User-ID", "u-1")
                .header("X-Session-ID", "s-1")
                .header("X-Request-ID", "trace-9")
                .body(())
                .unwrap(),
        )
        .await;
        assert_eq!(m.caller.user_id(), Some("u-1"));
        assert_eq!(m.caller.session_id.as_deref(), Some("s-1"));
        assert_eq!(m.trace_id, "trace-9");
    }

    #[tokio::test]
    async fn test_missing_headers_are_anonymous() {
        let m = meta(Request::builder().header("X-User-ID", " ").body(()).unwrap()).await;
        assert!(m.caller.identity.is_anonymous());
        assert!(m.caller.session_id.is_none());
        assert!(!m.trace_id.is_empty());
    }
}
