use axum::{
    async_trait,
    extract::{FromRequest, Request},
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// Upper bound on request bodies, enforced with `DefaultBodyLimit`.
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// JSON body extractor that accepts exactly one value with nothing after it.
///
/// Unknown fields are rejected by the target type (`#[serde(deny_unknown_fields)]`).
/// Every decode failure becomes a 400 carrying the decoder's message.
pub struct StrictJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        decode(&body).map(StrictJson)
    }
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    // Derived structs also deserialize from arrays in field order.
    let first = body.iter().find(|b| !b.is_ascii_whitespace());
    if matches!(first, Some(b) if *b != b'{') {
        return Err(AppError::validation("body must contain a single JSON object"));
    }
    let mut de = serde_json::Deserializer::from_slice(body);
    let value = T::deserialize(&mut de).map_err(|e| {
        debug!(error = %e, "request body rejected");
        AppError::validation(e.to_string())
    })?;
    de.end()
        .map_err(|_| AppError::validation("body must contain a single JSON object"))?;
    Ok(value)
}
