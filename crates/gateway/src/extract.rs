//! Request extractors whose rejections use the API error body.
//!
//! axum's stock `Json` and `Query` answer malformed input with plain-text
//! responses. These wrappers route every rejection through [`ApiError`] as a
//! validation failure.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use colloquy_core::Error;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// URL query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// JSON request body that may be absent. An empty body or a literal
/// `null` yields `None`. No content type is required.
#[derive(Debug)]
pub struct OptionalJson<T>(pub Option<T>);

impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }
        let value = serde_json::from_slice::<Option<T>>(&body)
            .map_err(|e| Error::Validation(format!("Failed to parse the request body as JSON: {e}")))?;
        Ok(Self(value))
    }
}
