//! Web framework integration surface.
//!
//! This module provides the boundary between HTTP frameworks and the
//! sanitization core. It handles:
//! - Mapping HTTP requests and responses to owned, rewritable views
//! - Choosing which representation of the input to sanitize
//! - Keeping every view of a rewritten body consistent
//! - Request-ID extraction for log events
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: Only the `http` crate's types are used.
//!    Framework-specific code converts to and from [`SanitizableRequest`]
//!    and [`SanitizableResponse`].
//!
//! 2. **One Source of Truth per Body**: [`RequestBody`] owns the bytes, the
//!    read cursor and the decoded JSON together, so a rewrite can never leave
//!    a stale view behind.
//!
//! 3. **Fail Open**: [`SanitizerMiddleware`] never rejects a request. A step
//!    that fails is logged and skipped.
//!
//! 4. **Explicit Policy**: The middleware holds an immutable
//!    [`SanitizationPolicy`](crate::SanitizationPolicy) built once at
//!    startup. No global settings lookup.
//!
//! # Example Flow
//!
//! ```
//! use request_sanitizer::{config, web::{example_handler::echo_json, SanitizableRequest, SanitizerMiddleware}};
//! use http::Method;
//!
//! // 1. Resolve configuration once at startup
//! let policy = config::from_toml_str(r#"
//!     allowed_tags = ["b"]
//!     exempt_preset = "credentials"
//! "#);
//! let middleware = SanitizerMiddleware::new(policy);
//!
//! // 2. Per request: build the view and run the handler through the middleware
//! let request = SanitizableRequest::new(Method::POST, "/echo-json/")
//!     .with_content_type("application/json")
//!     .with_body(r#"{"bio":"<i>x</i>","password":"<i>p</i>"}"#);
//! let response = middleware.handle(request, echo_json);
//!
//! assert_eq!(
//!     response.body().as_ref(),
//!     br#"{"received":{"bio":"x","password":"<i>p</i>"}}"#
//! );
//! ```

mod body;
mod content_type;
pub mod example_handler;
mod http_compat;
mod middleware;
mod params;
mod request;
mod response;

pub use body::RequestBody;
pub use content_type::{charset, media_type, ContentKind};
pub use http_compat::{SanitizedForm, SanitizedJson};
pub use middleware::{RequestPath, ResponsePath, SanitizerMiddleware};
pub use params::{FormData, FormValue, ParamMap, UploadedFile};
pub use request::{RequestParts, SanitizableRequest, REQUEST_ID_HEADER};
pub use response::SanitizableResponse;
