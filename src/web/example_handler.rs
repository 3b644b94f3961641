//! Example handlers showing what a handler sees after the middleware ran.
//!
//! **These examples are for documentation and testing only.**
//! They read sanitized input the way a real view would, without requiring
//! actual HTTP infrastructure.

use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::content_type::ContentKind;
use super::request::SanitizableRequest;
use super::response::SanitizableResponse;

#[derive(Debug, Serialize)]
struct Received<'a> {
    received: &'a Value,
}

#[derive(Debug, Serialize)]
struct FormEcho<'a> {
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MethodHint {
    method: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Echoes a JSON body back as `{"received": <payload>}`.
///
/// The handler prefers the sanitized value the middleware attached and only
/// parses the body itself when there is none (for example, when the
/// middleware is disabled).
///
/// Returns `400 Bad Request` if the content type is not JSON or the body does
/// not parse.
///
/// # Examples
///
/// ```
/// use request_sanitizer::{SanitizationPolicy, web::{example_handler::echo_json, SanitizableRequest, SanitizerMiddleware}};
/// use http::Method;
///
/// let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
/// let request = SanitizableRequest::new(Method::POST, "/echo-json/")
///     .with_content_type("application/json")
///     .with_body(r#"{"bio":"<script>alert(1)</script><b>bold</b>"}"#);
///
/// let response = middleware.handle(request, echo_json);
/// assert_eq!(response.body().as_ref(), br#"{"received":{"bio":"<b>bold</b>"}}"#);
/// ```
pub fn echo_json(request: &SanitizableRequest) -> SanitizableResponse {
    // 1. Only JSON bodies are echoed
    if request.content_kind() != ContentKind::Json {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorBody {
                error: "expected application/json",
            },
        );
    }

    // 2. Use the attached value, falling back to the body
    let payload = match request.sanitized_json() {
        Some(value) => value,
        None => match request.body().json() {
            Ok(value) => value,
            Err(_) => {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    &ErrorBody {
                        error: "invalid JSON",
                    },
                )
            }
        },
    };

    // 3. Echo it back
    json_response(StatusCode::OK, &Received { received: payload })
}

/// Returns the posted `name` field as `{"name": ...}`.
///
/// Non-POST requests get `{"method": "send a POST"}`.
///
/// # Examples
///
/// ```
/// use request_sanitizer::{SanitizationPolicy, web::{example_handler::form_view, SanitizableRequest, SanitizerMiddleware}};
/// use http::Method;
///
/// let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
/// let request = SanitizableRequest::new(Method::POST, "/form/")
///     .with_content_type("application/x-www-form-urlencoded")
///     .with_body("name=%3Cimg+src%3Dx+onerror%3Dalert(1)+%2F%3EJenil");
///
/// let response = middleware.handle(request, form_view);
/// assert_eq!(response.body().as_ref(), br#"{"name":"Jenil"}"#);
/// ```
pub fn form_view(request: &SanitizableRequest) -> SanitizableResponse {
    if *request.method() != Method::POST {
        return json_response(
            StatusCode::OK,
            &MethodHint {
                method: "send a POST",
            },
        );
    }

    let name = request.form().and_then(|form| form.text("name"));
    json_response(StatusCode::OK, &FormEcho { name })
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> SanitizableResponse {
    match serde_json::to_vec(body) {
        Ok(encoded) => SanitizableResponse::json(encoded).with_status(status),
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize handler response");
            SanitizableResponse::new(StatusCode::INTERNAL_SERVER_ERROR, bytes::Bytes::new())
        }
    }
}
