//! Framework-agnostic view of an incoming request.

use http::{header, HeaderMap, HeaderValue, Method};
use serde_json::Value;

use super::body::RequestBody;
use super::content_type::ContentKind;
use super::params::{FormData, ParamMap};

/// Header consulted for the request ID used in log events.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A request the sanitizer can read and rewrite in place.
///
/// `SanitizableRequest` holds simple, owned data so it does not couple to any
/// one framework. Framework integrations build it from their own request type
/// (see the `From<http::Request<Bytes>>` impl) and hand the rewritten parts
/// back after [`SanitizerMiddleware::process_request`](super::SanitizerMiddleware::process_request).
///
/// # Examples
///
/// ```
/// use request_sanitizer::web::SanitizableRequest;
/// use http::Method;
///
/// let mut request = SanitizableRequest::new(Method::POST, "/echo-json/")
///     .with_content_type("application/json")
///     .with_body(r#"{"bio":"<b>hi</b>"}"#);
/// request.set_query("q=search");
///
/// assert_eq!(request.query().get("q"), Some("search"));
/// assert!(request.method_carries_body());
/// ```
#[derive(Debug, Default)]
pub struct SanitizableRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: ParamMap,
    form: Option<FormData>,
    body: RequestBody,
    sanitized_json: Option<Value>,
}

impl SanitizableRequest {
    /// Creates a request with an empty query, no headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the `Content-Type` header. Invalid header values are ignored.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(header::CONTENT_TYPE, value);
        }
        self
    }

    /// Sets the raw body.
    pub fn with_body(mut self, raw: impl Into<bytes::Bytes>) -> Self {
        self.body = RequestBody::new(raw);
        self
    }

    /// Sets the decoded form fields, as a host multipart/form parser would.
    pub fn with_form(mut self, form: FormData) -> Self {
        self.form = Some(form);
        self
    }

    /// Replaces the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Parses and sets the query string (without the leading `?`).
    pub fn set_query(&mut self, query: &str) {
        self.query = ParamMap::parse(query);
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw `Content-Type` header, if present and valid text.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Classifies the `Content-Type` header.
    pub fn content_kind(&self) -> ContentKind {
        self.content_type()
            .map_or(ContentKind::Other, ContentKind::from_header)
    }

    /// Returns the `x-request-id` header, or `"-"`.
    pub fn request_id(&self) -> &str {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
    }

    /// Returns `true` for POST, PUT and PATCH.
    pub fn method_carries_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }

    /// Returns the query parameters.
    pub fn query(&self) -> &ParamMap {
        &self.query
    }

    /// Takes the query parameters out, leaving an empty map.
    pub fn take_query(&mut self) -> ParamMap {
        std::mem::take(&mut self.query)
    }

    /// Replaces the query parameters.
    pub fn replace_query(&mut self, query: ParamMap) {
        self.query = query;
    }

    /// Returns the decoded form fields.
    ///
    /// `None` until either the host supplied them or the sanitizer decoded a
    /// url-encoded body.
    pub fn form(&self) -> Option<&FormData> {
        self.form.as_ref()
    }

    /// Takes the decoded form fields out, leaving `None`.
    pub fn take_form(&mut self) -> Option<FormData> {
        self.form.take()
    }

    /// Installs decoded form fields.
    pub fn replace_form(&mut self, form: FormData) {
        self.form = Some(form);
    }

    /// Returns the body.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Returns the body for rewriting or streaming reads.
    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    /// The sanitized JSON value attached after a JSON body was rewritten.
    ///
    /// Handlers can use this instead of parsing the body a second time.
    pub fn sanitized_json(&self) -> Option<&Value> {
        self.sanitized_json.as_ref()
    }

    pub(crate) fn attach_sanitized_json(&mut self, value: Value) {
        self.sanitized_json = Some(value);
    }

    /// Splits the request into its rewritten parts.
    pub fn into_parts(self) -> RequestParts {
        RequestParts {
            method: self.method,
            path: self.path,
            headers: self.headers,
            query: self.query,
            form: self.form,
            body: self.body,
            sanitized_json: self.sanitized_json,
        }
    }
}

/// Owned parts of a [`SanitizableRequest`].
#[derive(Debug)]
pub struct RequestParts {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Query parameters.
    pub query: ParamMap,
    /// Decoded form fields, if any.
    pub form: Option<FormData>,
    /// Body.
    pub body: RequestBody,
    /// Sanitized JSON attachment, if any.
    pub sanitized_json: Option<Value>,
}
