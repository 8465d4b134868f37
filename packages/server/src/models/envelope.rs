use std::collections::BTreeMap;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Encode `payload` as `{"<key>": payload}`, tab-indented, with a trailing newline.
pub fn encode<T: Serialize + ?Sized>(key: &str, payload: &T) -> Result<Bytes, serde_json::Error> {
    encode_value(&BTreeMap::from([(key, payload)]))
}

/// Encode an already enveloped value with the same formatting as [`encode`].
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, serde_json::Error> {
    let mut buf = Vec::with_capacity(256);
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    buf.push(b'\n');

    Ok(Bytes::from(buf))
}

/// An already-encoded JSON envelope plus status and extra headers.
#[derive(Debug)]
pub struct JsonResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl JsonResponse {
    pub fn new(status: StatusCode, body: Bytes) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn ok(body: Bytes) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl IntoResponse for JsonResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        headers.extend(self.headers);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
