//! Conversions between the sanitizer's request/response views and `http` types.
//!
//! Any framework built on the `http` crate can run the middleware by
//! converting its buffered request in, and converting the rewritten request
//! back out before dispatch:
//!
//! ```
//! use bytes::Bytes;
//! use request_sanitizer::{SanitizationPolicy, web::{SanitizableRequest, SanitizedJson, SanitizerMiddleware}};
//! use serde_json::json;
//!
//! let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
//! let incoming = http::Request::post("/echo-json/?q=%3Cscript%3Ex%3C%2Fscript%3E")
//!     .header("content-type", "application/json")
//!     .body(Bytes::from_static(br#"{"bio":"<script>x</script>hi"}"#))
//!     .unwrap();
//!
//! let mut request = SanitizableRequest::from(incoming);
//! middleware.process_request(&mut request);
//! let outgoing = request.into_http().unwrap();
//!
//! assert_eq!(outgoing.uri(), "/echo-json/?q=");
//! assert_eq!(outgoing.extensions().get::<SanitizedJson>(), Some(&SanitizedJson(json!({"bio": "hi"}))));
//! ```

use bytes::Bytes;
use http::{header, HeaderValue};
use serde_json::Value;

use super::params::FormData;
use super::request::SanitizableRequest;
use super::response::SanitizableResponse;
use crate::error::{SanitizationError, SanitizationErrorKind};

/// The sanitized JSON body, attached as a request extension.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedJson(pub Value);

/// The sanitized form fields, attached as a request extension.
///
/// For multipart requests this is the only sanitized view: the raw multipart
/// body is not carried over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedForm(pub FormData);

impl From<http::Request<Bytes>> for SanitizableRequest {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut converted = SanitizableRequest::new(parts.method, parts.uri.path())
            .with_headers(parts.headers)
            .with_body(body);
        if let Some(query) = parts.uri.query() {
            converted.set_query(query);
        }
        converted
    }
}

impl SanitizableRequest {
    /// Rebuilds an `http::Request` from the rewritten parts.
    ///
    /// The query string is re-encoded from the sanitized parameters, and an
    /// existing `Content-Length` header is updated to the body's length. A
    /// sanitized JSON value or form is attached as [`SanitizedJson`] or
    /// [`SanitizedForm`]. A consumed body becomes empty.
    ///
    /// # Errors
    ///
    /// `Serialization` if the path and query do not form a valid URI.
    pub fn into_http(self) -> Result<http::Request<Bytes>, SanitizationError> {
        let parts = self.into_parts();
        let uri = if parts.query.is_empty() {
            parts.path
        } else {
            format!("{}?{}", parts.path, parts.query.encode())
        };
        let body = parts.body.into_bytes().unwrap_or_default();

        let mut headers = parts.headers;
        if headers.contains_key(header::CONTENT_LENGTH) {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let mut request = http::Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)
            .map_err(|err| {
                SanitizationError::new(SanitizationErrorKind::Serialization, err.to_string())
            })?;
        *request.headers_mut() = headers;
        if let Some(value) = parts.sanitized_json {
            request.extensions_mut().insert(SanitizedJson(value));
        }
        if let Some(form) = parts.form {
            request.extensions_mut().insert(SanitizedForm(form));
        }
        Ok(request)
    }
}

impl From<http::Response<Bytes>> for SanitizableResponse {
    fn from(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        let mut converted = SanitizableResponse::new(parts.status, body);
        *converted.headers_mut() = parts.headers;
        converted
    }
}

impl SanitizableResponse {
    /// Rebuilds an `http::Response` from the (possibly rewritten) parts.
    pub fn into_http(self) -> http::Response<Bytes> {
        let (status, headers, body) = self.into_parts();
        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}
