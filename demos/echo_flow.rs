//! Request sanitization demonstration.
//!
//! This example drives a few requests through the middleware and prints what
//! the handlers saw:
//! 1. Resolve a policy from TOML
//! 2. Sanitize a JSON body, a url-encoded form and a query string
//! 3. Leave a malformed body alone
//! 4. Clean an HTML response
//!
//! Run with: `cargo run --example echo_flow`

use http::{header, HeaderMap, HeaderValue, Method};
use request_sanitizer::config;
use request_sanitizer::web::example_handler::{echo_json, form_view};
use request_sanitizer::web::{SanitizableRequest, SanitizableResponse, SanitizerMiddleware};

const CONFIG: &str = r#"
[sanitizer]
allowed_tags = ["b", "i", "a", "p"]
exempt_preset = "credentials"
sanitize_response_html = true
debug = true

[sanitizer.allowed_attributes]
a = ["href"]
"#;

fn with_request_id(request: SanitizableRequest, id: &'static str) -> SanitizableRequest {
    let mut headers = HeaderMap::new();
    headers.insert("x-request-id", HeaderValue::from_static(id));
    request.with_headers(headers)
}

fn show(label: &str, response: &SanitizableResponse) {
    println!(
        "{:<14} {} {}",
        label,
        response.status(),
        String::from_utf8_lossy(response.body())
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Request Sanitizer Demo ===\n");

    // 1. Policy is resolved once and shared by every request
    let middleware = SanitizerMiddleware::new(config::from_toml_str(CONFIG));

    // 2. JSON body: script removed, bold kept, password untouched
    let request = with_request_id(
        SanitizableRequest::new(Method::POST, "/echo-json/")
            .with_content_type("application/json")
            .with_body(
                r#"{"bio":"<script>alert(1)</script><b>bold</b>","password":"<b>p@ss</b>"}"#,
            ),
        "req-json",
    );
    show("echo-json", &middleware.handle(request, echo_json));

    // 3. Url-encoded form: image and its handler removed
    let request = with_request_id(
        SanitizableRequest::new(Method::POST, "/form/")
            .with_content_type("application/x-www-form-urlencoded")
            .with_body("name=%3Cimg+src%3Dx+onerror%3Dalert(1)+%2F%3EJenil"),
        "req-form",
    );
    show("form", &middleware.handle(request, form_view));

    // 4. Query string
    let mut request = with_request_id(SanitizableRequest::new(Method::GET, "/search"), "req-query");
    request.set_query("q=%3Cscript%3Ex%3C%2Fscript%3Erust");
    let response = middleware.handle(request, |req| {
        SanitizableResponse::json(format!(r#"{{"q":{:?}}}"#, req.query().get("q").unwrap_or("")))
    });
    show("search", &response);

    // 5. Malformed JSON reaches the handler unchanged
    let request = with_request_id(
        SanitizableRequest::new(Method::POST, "/echo-json/")
            .with_content_type("application/json")
            .with_body(r#"{"a":"#),
        "req-bad",
    );
    show("malformed", &middleware.handle(request, echo_json));

    // 6. HTML response cleaning
    let request = with_request_id(SanitizableRequest::new(Method::GET, "/page"), "req-html");
    let response = middleware.handle(request, |_| {
        let html = r#"<p onclick="x()">Hi <a href="/home" target="_blank">home</a></p><script>y</script>"#;
        SanitizableResponse::html(html)
            .with_header(header::CONTENT_LENGTH, HeaderValue::from(html.len()))
    });
    show("page", &response);
    println!(
        "{:<14} content-length={:?}",
        "",
        response.headers().get(header::CONTENT_LENGTH)
    );

    println!("\n=== Demo Complete ===");
}
