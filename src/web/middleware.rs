//! Pre- and post-dispatch sanitization of requests and responses.
//!
//! This module is the boundary layer between a host framework and the
//! [`Walker`]. It decides, once per request, which representation of the
//! input to rewrite, and it is the single place where internal errors are
//! turned into fail-open behaviour:
//!
//! - a malformed body is left as it is and the request proceeds
//! - a step that fails is logged and skipped; later steps still run
//! - a leaf whose cleaning fails keeps its original text (inside the walker)
//!
//! Nothing here ever rejects a request.
//!
//! # Request flow
//!
//! ```text
//! HTTP Request
//!   ↓
//! Host builds SanitizableRequest (or converts from http::Request<Bytes>)
//!   ↓
//! process_request(): Disabled | QueryOnly | Form | Json
//!   ↓
//! Handler reads sanitized query, form fields, body bytes or SanitizedJson
//!   ↓
//! process_response(): Skipped | Unchanged | Html
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::cleaner::{AmmoniaCleaner, HtmlCleaner};
use crate::error::{SanitizationError, SanitizationErrorKind};
use crate::logging::DiffLog;
use crate::payload::PayloadValue;
use crate::policy::SanitizationPolicy;
use crate::walker::Walker;

use super::content_type::ContentKind;
use super::params::{FormData, FormValue, ParamMap};
use super::request::{SanitizableRequest, REQUEST_ID_HEADER};
use super::response::SanitizableResponse;

/// Which input representation the pre-dispatch phase rewrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPath {
    /// The policy is disabled; nothing was touched.
    Disabled,
    /// Only query parameters were sanitized.
    QueryOnly,
    /// Query parameters and decoded form fields were sanitized.
    Form,
    /// Query parameters and the JSON body were sanitized.
    Json,
}

/// What the post-dispatch phase did to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePath {
    /// Response cleaning is off, or the response is not non-empty HTML.
    Skipped,
    /// The HTML was inspected and needed no change, or cleaning failed.
    Unchanged,
    /// The HTML body was rewritten.
    Html,
}

/// Sanitizes requests before they reach a handler, and optionally HTML
/// responses after it.
///
/// The middleware holds an immutable, shared policy and a cleaner; it keeps no
/// per-request state, so one instance can serve any number of concurrent
/// requests.
///
/// # Examples
///
/// ```
/// use request_sanitizer::{SanitizationPolicy, web::{SanitizableRequest, SanitizerMiddleware, RequestPath}};
/// use http::Method;
/// use serde_json::json;
///
/// let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
///
/// let mut request = SanitizableRequest::new(Method::POST, "/echo-json/")
///     .with_content_type("application/json")
///     .with_body(r#"{"bio":"<script>alert(1)</script><b>bold</b>"}"#);
///
/// assert_eq!(middleware.process_request(&mut request), RequestPath::Json);
/// assert_eq!(request.sanitized_json(), Some(&json!({"bio": "<b>bold</b>"})));
/// assert_eq!(request.body().raw().unwrap().as_ref(), br#"{"bio":"<b>bold</b>"}"#);
/// ```
#[derive(Debug)]
pub struct SanitizerMiddleware<C = AmmoniaCleaner> {
    policy: Arc<SanitizationPolicy>,
    cleaner: Arc<C>,
}

impl<C> Clone for SanitizerMiddleware<C> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
            cleaner: Arc::clone(&self.cleaner),
        }
    }
}

impl SanitizerMiddleware {
    /// Creates a middleware that cleans with [`AmmoniaCleaner`].
    pub fn new(policy: impl Into<Arc<SanitizationPolicy>>) -> Self {
        Self::with_cleaner(policy, AmmoniaCleaner)
    }
}

impl<C: HtmlCleaner> SanitizerMiddleware<C> {
    /// Creates a middleware with a custom cleaner.
    pub fn with_cleaner(policy: impl Into<Arc<SanitizationPolicy>>, cleaner: C) -> Self {
        Self {
            policy: policy.into(),
            cleaner: Arc::new(cleaner),
        }
    }

    /// Returns the policy.
    pub fn policy(&self) -> &SanitizationPolicy {
        &self.policy
    }

    /// Runs the pre-dispatch phase on `request`, rewriting it in place.
    ///
    /// The path is chosen from the method and content type alone. A `Json`
    /// path whose body turns out not to parse leaves the body untouched.
    pub fn process_request(&self, request: &mut SanitizableRequest) -> RequestPath {
        let request_id = request.request_id().to_owned();
        let span = tracing::debug_span!(
            "sanitize_request",
            request_id = %request_id,
            method = %request.method()
        );
        let _enter = span.enter();

        if !self.policy.enabled() {
            return RequestPath::Disabled;
        }

        let log = DiffLog::new(&request_id, self.policy.debug());
        let walker = Walker::with_log(&self.policy, &*self.cleaner, log);

        let query = request.take_query();
        request.replace_query(sanitize_params(&walker, query));

        let path = request_path(request);
        let outcome = match path {
            RequestPath::Form => sanitize_form(&walker, request, log).map_err(|e| ("form", e)),
            RequestPath::Json => sanitize_json(&walker, request, log).map_err(|e| ("json", e)),
            RequestPath::Disabled | RequestPath::QueryOnly => Ok(()),
        };
        if let Err((step, err)) = outcome {
            log.step_skipped(step, &err);
        }

        path
    }

    /// Runs the post-dispatch phase on `response`.
    ///
    /// Log events use the response's `x-request-id` header, if it carries one.
    pub fn process_response(&self, response: &mut SanitizableResponse) -> ResponsePath {
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_owned();
        self.sanitize_response(&request_id, response)
    }

    /// Runs the pre-dispatch phase, the handler, then the post-dispatch phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_sanitizer::{SanitizationPolicy, web::{SanitizableRequest, SanitizableResponse, SanitizerMiddleware}};
    /// use http::Method;
    ///
    /// let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
    /// let mut request = SanitizableRequest::new(Method::GET, "/search");
    /// request.set_query("q=%3Cscript%3Ex%3C%2Fscript%3Erust");
    ///
    /// let response = middleware.handle(request, |req| {
    ///     SanitizableResponse::json(format!("{:?}", req.query().get("q")))
    /// });
    ///
    /// assert_eq!(response.body().as_ref(), br#"Some("rust")"#);
    /// ```
    pub fn handle<F>(&self, mut request: SanitizableRequest, handler: F) -> SanitizableResponse
    where
        F: FnOnce(&SanitizableRequest) -> SanitizableResponse,
    {
        self.process_request(&mut request);
        let mut response = handler(&request);
        self.sanitize_response(request.request_id(), &mut response);
        response
    }

    fn sanitize_response(&self, request_id: &str, response: &mut SanitizableResponse) -> ResponsePath {
        let span = tracing::debug_span!("sanitize_response", request_id = %request_id);
        let _enter = span.enter();

        if !self.policy.sanitize_response_html()
            || response.content_kind() != ContentKind::Html
            || response.body().is_empty()
        {
            return ResponsePath::Skipped;
        }

        let log = DiffLog::new(request_id, self.policy.debug());
        match self.rewrite_html(response) {
            Ok(true) => ResponsePath::Html,
            Ok(false) => ResponsePath::Unchanged,
            Err(err) => {
                log.step_skipped("response_html", &err);
                ResponsePath::Unchanged
            }
        }
    }

    fn rewrite_html(&self, response: &mut SanitizableResponse) -> Result<bool, SanitizationError> {
        let text = response.decode_text()?;
        let cleaned = self.cleaner.clean(&text, self.policy.rules())?;
        if cleaned == text {
            return Ok(false);
        }
        response.replace_text(&cleaned)?;
        Ok(true)
    }
}

fn request_path(request: &SanitizableRequest) -> RequestPath {
    if !request.method_carries_body() {
        return RequestPath::QueryOnly;
    }
    match request.content_kind() {
        kind if kind.is_form() => RequestPath::Form,
        ContentKind::Json if !request.body().is_empty() => RequestPath::Json,
        _ => RequestPath::QueryOnly,
    }
}

fn sanitize_params<C: HtmlCleaner + ?Sized>(walker: &Walker<'_, C>, params: ParamMap) -> ParamMap {
    params
        .into_iter()
        .map(|(key, values)| {
            let values = values
                .into_iter()
                .map(|value| walker.walk_text_field(&key, value))
                .collect();
            (key, values)
        })
        .collect()
}

fn sanitize_form<C: HtmlCleaner + ?Sized>(
    walker: &Walker<'_, C>,
    request: &mut SanitizableRequest,
    log: DiffLog<'_>,
) -> Result<(), SanitizationError> {
    let kind = request.content_kind();
    let form = match request.take_form() {
        Some(form) => form,
        None if kind == ContentKind::FormUrlEncoded => {
            FormData::from_params(ParamMap::parse_bytes(request.body().raw()?))
        }
        None => {
            log.debug(format_args!("multipart request without decoded fields"));
            return Ok(());
        }
    };

    let cleaned: FormData = form
        .into_iter()
        .map(|(key, values)| {
            let values = values
                .into_iter()
                .map(|value| match value {
                    FormValue::Text(text) => FormValue::Text(walker.walk_text_field(&key, text)),
                    file @ FormValue::File(_) => file,
                })
                .collect();
            (key, values)
        })
        .collect();

    if kind == ContentKind::FormUrlEncoded {
        request.body_mut().replace(cleaned.to_params().encode());
    } else {
        request.body_mut().mark_consumed();
    }
    request.replace_form(cleaned);
    Ok(())
}

fn sanitize_json<C: HtmlCleaner + ?Sized>(
    walker: &Walker<'_, C>,
    request: &mut SanitizableRequest,
    log: DiffLog<'_>,
) -> Result<(), SanitizationError> {
    let parsed = match request.body().json() {
        Ok(value) => value.clone(),
        Err(err) if err.kind() == SanitizationErrorKind::MalformedBody => {
            log.debug(format_args!("json step: {}; leaving body untouched", err.kind()));
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let cleaned = Value::from(walker.walk(PayloadValue::from(parsed), None));
    request.body_mut().replace_json(cleaned.clone())?;
    request.attach_sanitized_json(cleaned);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::policy::CleanRules;
    use crate::web::UploadedFile;
    use http::{header, HeaderValue, Method, StatusCode};
    use serde_json::json;

    /// Counts calls, then delegates to ammonia.
    #[derive(Default)]
    struct CountingCleaner {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl HtmlCleaner for CountingCleaner {
        fn clean(&self, text: &str, rules: &CleanRules) -> Result<String, SanitizationError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            AmmoniaCleaner.clean(text, rules)
        }
    }

    /// Always fails.
    struct BrokenCleaner;

    impl HtmlCleaner for BrokenCleaner {
        fn clean(&self, _: &str, _: &CleanRules) -> Result<String, SanitizationError> {
            Err(SanitizationError::new(
                SanitizationErrorKind::CleanerFailure,
                "broken",
            ))
        }
    }

    fn json_request(body: &'static str) -> SanitizableRequest {
        SanitizableRequest::new(Method::POST, "/echo-json/")
            .with_content_type("application/json")
            .with_body(body)
    }

    #[test]
    fn disabled_policy_touches_nothing() {
        let policy = SanitizationPolicy::builder().enabled(false).build();
        let middleware = SanitizerMiddleware::new(policy);
        let mut request = json_request(r#"{"bio":"<script>x</script>"}"#);
        request.set_query("q=%3Cscript%3E");

        assert_eq!(middleware.process_request(&mut request), RequestPath::Disabled);
        assert_eq!(request.query().get("q"), Some("<script>"));
        assert_eq!(
            request.body().raw().unwrap().as_ref(),
            br#"{"bio":"<script>x</script>"}"#
        );
        assert!(request.sanitized_json().is_none());
    }

    #[test]
    fn path_is_chosen_from_method_and_content_type() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
        let cases = [
            (Method::GET, Some("application/json"), "{}", RequestPath::QueryOnly),
            (Method::POST, Some("application/json"), "{}", RequestPath::Json),
            (Method::PATCH, Some("application/json"), "", RequestPath::QueryOnly),
            (Method::PUT, Some("multipart/form-data; boundary=b"), "", RequestPath::Form),
            (Method::POST, Some("application/x-www-form-urlencoded"), "a=b", RequestPath::Form),
            (Method::POST, Some("text/plain"), "hi", RequestPath::QueryOnly),
            (Method::POST, None, "hi", RequestPath::QueryOnly),
        ];

        for (method, content_type, body, expected) in cases {
            let mut request = SanitizableRequest::new(method.clone(), "/").with_body(body);
            if let Some(ct) = content_type {
                request = request.with_content_type(ct);
            }
            assert_eq!(
                middleware.process_request(&mut request),
                expected,
                "{} {:?}",
                method,
                content_type
            );
        }
    }

    #[test]
    fn json_body_views_agree_after_rewrite() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
        let mut request = json_request(r#"{"bio":"<script>alert(1)</script><b>bold</b>","n":3}"#);

        middleware.process_request(&mut request);

        let expected = json!({"bio": "<b>bold</b>", "n": 3});
        let raw: Value = serde_json::from_slice(request.body().raw().unwrap()).unwrap();
        assert_eq!(raw, expected);
        assert_eq!(request.body().json().unwrap(), &expected);
        assert_eq!(request.sanitized_json(), Some(&expected));

        let mut streamed = String::new();
        request.body_mut().read_to_string(&mut streamed).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&streamed).unwrap(), expected);
    }

    #[test]
    fn malformed_json_is_left_alone() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
        let mut request = json_request(r#"{"a":"#);

        assert_eq!(middleware.process_request(&mut request), RequestPath::Json);
        assert_eq!(request.body().raw().unwrap().as_ref(), br#"{"a":"#);
        assert!(request.sanitized_json().is_none());
    }

    #[test]
    fn urlencoded_body_is_decoded_cleaned_and_reencoded() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
        let mut request = SanitizableRequest::new(Method::POST, "/form/")
            .with_content_type("application/x-www-form-urlencoded")
            .with_body("name=%3Cimg+src%3Dx+onerror%3Dalert(1)+%2F%3EJenil&age=30");

        middleware.process_request(&mut request);

        let form = request.form().unwrap();
        assert_eq!(form.text("name"), Some("Jenil"));
        assert_eq!(form.text("age"), Some("30"));
        let body = ParamMap::parse_bytes(request.body().raw().unwrap());
        assert_eq!(body.get("name"), Some("Jenil"));
    }

    #[test]
    fn multipart_keeps_files_and_consumes_raw_body() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
        let mut form = FormData::new();
        form.append_text("title", "<script>x</script>hello");
        let upload = FormValue::File(UploadedFile {
            filename: Some("evil.html".to_string()),
            content_type: Some("text/html".to_string()),
            data: bytes::Bytes::from_static(b"<script>keep</script>"),
        });
        form.append("upload", upload.clone());
        let mut request = SanitizableRequest::new(Method::POST, "/upload/")
            .with_content_type("multipart/form-data; boundary=xyz")
            .with_body("--xyz raw multipart bytes")
            .with_form(form);

        assert_eq!(middleware.process_request(&mut request), RequestPath::Form);

        let form = request.form().unwrap();
        assert_eq!(form.text("title"), Some("hello"));
        assert_eq!(form.get_all("upload"), [upload]);
        assert_eq!(
            request.body().raw().unwrap_err().kind(),
            SanitizationErrorKind::BodyConsumed
        );
    }

    #[test]
    fn multipart_without_decoded_fields_is_skipped() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
        let mut request = SanitizableRequest::new(Method::POST, "/upload/")
            .with_content_type("multipart/form-data; boundary=xyz")
            .with_body("--xyz");

        assert_eq!(middleware.process_request(&mut request), RequestPath::Form);
        assert!(request.form().is_none());
        assert_eq!(request.body().raw().unwrap().as_ref(), b"--xyz");
    }

    #[test]
    fn exempt_query_parameter_is_untouched() {
        let policy = SanitizationPolicy::builder()
            .exempt_fields(["token"].into_iter().collect())
            .build();
        let middleware = SanitizerMiddleware::new(policy);
        let mut request = SanitizableRequest::new(Method::GET, "/");
        request.set_query("token=%3Cb%3E&q=%3Cscript%3Ex%3C%2Fscript%3E&q=%3Ci%3Eok%3C%2Fi%3E");

        middleware.process_request(&mut request);

        assert_eq!(request.query().get("token"), Some("<b>"));
        assert_eq!(request.query().get_all("q"), ["", "<i>ok</i>"]);
    }

    #[test]
    fn failing_cleaner_never_blocks_request() {
        let middleware = SanitizerMiddleware::with_cleaner(SanitizationPolicy::default(), BrokenCleaner);
        let mut request = json_request(r#"{"bio":"<script>x</script>"}"#);
        request.set_query("q=%3Cscript%3E");

        assert_eq!(middleware.process_request(&mut request), RequestPath::Json);
        assert_eq!(request.query().get("q"), Some("<script>"));
        assert_eq!(
            request.sanitized_json(),
            Some(&json!({"bio": "<script>x</script>"}))
        );
    }

    #[test]
    fn response_cleaning_is_off_by_default() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::default());
        let mut response = SanitizableResponse::html("<script>x</script>");

        assert_eq!(middleware.process_response(&mut response), ResponsePath::Skipped);
        assert_eq!(response.body().as_ref(), b"<script>x</script>");
    }

    #[test]
    fn response_html_is_rewritten_with_length() {
        let policy = SanitizationPolicy::builder().sanitize_response_html(true).build();
        let middleware = SanitizerMiddleware::new(policy);
        let mut response = SanitizableResponse::html("<p>hi</p><script>x</script>")
            .with_header(header::CONTENT_LENGTH, HeaderValue::from(27usize));

        assert_eq!(middleware.process_response(&mut response), ResponsePath::Html);
        assert_eq!(response.body().as_ref(), b"<p>hi</p>");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "9");
    }

    #[test]
    fn clean_response_is_unchanged() {
        let policy = SanitizationPolicy::builder().sanitize_response_html(true).build();
        let middleware = SanitizerMiddleware::new(policy);
        let mut response = SanitizableResponse::html("<p>fine</p>");

        assert_eq!(middleware.process_response(&mut response), ResponsePath::Unchanged);
    }

    #[test]
    fn non_html_and_empty_responses_are_skipped() {
        let policy = SanitizationPolicy::builder().sanitize_response_html(true).build();
        let middleware = SanitizerMiddleware::new(policy);
        let mut json = SanitizableResponse::json(r#"{"x":"<script>"}"#);
        let mut empty = SanitizableResponse::html("");

        assert_eq!(middleware.process_response(&mut json), ResponsePath::Skipped);
        assert_eq!(middleware.process_response(&mut empty), ResponsePath::Skipped);
    }

    #[test]
    fn undecodable_response_is_left_alone() {
        let policy = SanitizationPolicy::builder().sanitize_response_html(true).build();
        let middleware = SanitizerMiddleware::new(policy);
        let mut response = SanitizableResponse::new(StatusCode::OK, &b"\xff<script>"[..]).with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );

        assert_eq!(middleware.process_response(&mut response), ResponsePath::Unchanged);
        assert_eq!(response.body().as_ref(), b"\xff<script>");
    }

    #[test]
    fn handle_runs_both_phases() {
        let policy = SanitizationPolicy::builder().sanitize_response_html(true).build();
        let middleware = SanitizerMiddleware::with_cleaner(policy, CountingCleaner::default());
        let request = json_request(r#"{"a":"<b>x</b>"}"#);

        let response = middleware.handle(request, |req| {
            let a = req.sanitized_json().unwrap()["a"].as_str().unwrap().to_string();
            SanitizableResponse::html(format!("{}<script>y</script>", a))
        });

        assert_eq!(response.body().as_ref(), b"<b>x</b>");
        assert_eq!(
            middleware
                .cleaner
                .calls
                .load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }

    #[test]
    fn clones_share_policy() {
        let middleware = SanitizerMiddleware::new(SanitizationPolicy::strict());
        let clone = middleware.clone();

        assert!(std::ptr::eq(middleware.policy(), clone.policy()));
    }
}
