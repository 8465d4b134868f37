use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::AppError;

/// Ceiling for JSON request bodies.
pub const MAX_JSON_BODY_BYTES: usize = 1_048_576;

/// Strict JSON body extractor.
///
/// Rejects empty bodies, bodies over [`MAX_JSON_BODY_BYTES`], unknown keys
/// (with `#[serde(deny_unknown_fields)]` on `T`) and trailing values, each with
/// its own `400` message.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large()
            } else {
                AppError::BadRequest(e.body_text())
            }
        })?;
        decode(&body).map(AppJson)
    }
}

fn too_large() -> AppError {
    AppError::BadRequest(format!(
        "body must not be larger than {MAX_JSON_BODY_BYTES} bytes"
    ))
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    if body.len() > MAX_JSON_BODY_BYTES {
        return Err(too_large());
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("body must not be empty".into()));
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    let value = T::deserialize(&mut de).map_err(describe)?;
    de.end().map_err(|_| {
        AppError::BadRequest("body must only contain a single JSON value".into())
    })?;
    Ok(value)
}

fn describe(err: serde_json::Error) -> AppError {
    let message = match err.classify() {
        Category::Syntax => format!(
            "body contains badly-formed JSON (at line {} column {})",
            err.line(),
            err.column()
        ),
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Data => match unknown_field(&err.to_string()) {
            Some(field) => format!("body contains unknown key \"{field}\""),
            None => format!(
                "body contains incorrect JSON type (at line {} column {})",
                err.line(),
                err.column()
            ),
        },
        Category::Io => return AppError::Internal(err.to_string()),
    };
    AppError::BadRequest(message)
}

/// Extract `x` from serde's "unknown field `x`, expected ..." message.
fn unknown_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    rest.split('`').next()
}
