//! HTML sanitization for HTTP request and response payloads.
//!
//! This crate cleans markup out of untrusted text before a handler sees it:
//! - **Policy**: an immutable allowlist of tags and attributes, plus field
//!   names that are never touched
//! - **Walker**: shape-preserving recursion over structured payloads
//! - **Cleaner**: the allowlist primitive, behind the [`HtmlCleaner`] trait
//! - **Middleware**: request/response rewriting that keeps every view of a
//!   body consistent and never rejects a request
//!
//! # Core Types
//!
//! - [`SanitizationPolicy`]: Allowed markup, exempt fields and feature switches
//! - [`PayloadValue`]: A decoded payload (JSON, query value or form field)
//! - [`Walker`]: Cleans every string leaf not under an exempt key
//! - [`AmmoniaCleaner`]: The default [`HtmlCleaner`], backed by `ammonia`
//! - [`web::SanitizerMiddleware`]: Pre- and post-dispatch integration
//!
//! # Examples
//!
//! ```
//! use request_sanitizer::{AmmoniaCleaner, ExemptFields, PayloadValue, SanitizationPolicy, Walker};
//! use serde_json::json;
//!
//! // The policy is built once and shared
//! let policy = SanitizationPolicy::builder()
//!     .allowed_tags(["b"])
//!     .exempt_fields(ExemptFields::credentials())
//!     .build();
//!
//! let walker = Walker::new(&policy, &AmmoniaCleaner);
//! let cleaned = walker.walk(
//!     PayloadValue::from(json!({"bio": "<script>x</script><b>hi</b>", "token": "<b>t</b>"})),
//!     None,
//! );
//!
//! assert_eq!(
//!     serde_json::Value::from(cleaned),
//!     json!({"bio": "<b>hi</b>", "token": "<b>t</b>"})
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cleaner;
pub mod config;
mod error;
mod logging;
mod payload;
mod policy;
mod walker;

pub mod web;

#[cfg(test)]
mod test_utils;

pub use cleaner::{AmmoniaCleaner, HtmlCleaner};
pub use error::{SanitizationError, SanitizationErrorKind};
pub use logging::DiffLog;
pub use payload::PayloadValue;
pub use policy::{
    CleanRules, ExemptFields, PolicyBuilder, SanitizationPolicy, CREDENTIAL_FIELDS,
    DEFAULT_ALLOWED_TAGS, DEFAULT_LINK_ATTRIBUTES,
};
pub use walker::Walker;
