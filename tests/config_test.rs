//! Integration tests for configuration resolution from files on disk.

use std::io::Write;

use request_sanitizer::{config, AmmoniaCleaner, HtmlCleaner, SanitizationPolicy, CREDENTIAL_FIELDS};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn load_reads_sanitizer_section() {
    let file = config_file(
        r#"
        [server]
        port = 8080

        [sanitizer]
        allowed_tags = ["B", "A"]
        strip = false
        sanitize_response_html = true
        exempt_fields = ["signature"]
        debug = true

        [sanitizer.allowed_attributes]
        A = ["HREF"]
        "#,
    );

    let policy = config::load(file.path());

    assert!(policy.enabled());
    assert!(policy.rules().allows_tag("b"));
    assert!(policy.rules().allows_tag("a"));
    assert!(!policy.rules().allows_tag("i"));
    assert!(!policy.rules().strip());
    assert!(policy.sanitize_response_html());
    assert!(policy.debug());
    assert!(policy.is_exempt("signature"));
    assert!(!policy.is_exempt("password"));
    assert!(policy.rules().attributes()["a"].contains("href"));
}

#[test]
fn load_without_section_uses_top_level_keys() {
    let file = config_file("allowed_tags = []\nexempt_preset = \"credentials\"\n");

    let policy = config::load(file.path());

    assert!(policy.rules().tags().is_empty());
    for field in CREDENTIAL_FIELDS {
        assert!(policy.is_exempt(field), "{} should be exempt", field);
    }
}

#[test]
fn empty_file_gives_documented_defaults() {
    let file = config_file("");

    assert_eq!(config::load(file.path()), SanitizationPolicy::default());
}

#[test]
fn missing_file_is_strict() {
    let dir = tempfile::tempdir().expect("create temp dir");

    let policy = config::load(dir.path().join("absent.toml"));

    assert_eq!(policy, SanitizationPolicy::strict());
}

#[test]
fn unreadable_path_is_strict() {
    let dir = tempfile::tempdir().expect("create temp dir");

    // A directory exists but cannot be read as a file.
    assert_eq!(config::load(dir.path()), SanitizationPolicy::strict());
}

#[test]
fn invalid_toml_file_is_strict() {
    let file = config_file("[sanitizer\nallowed_tags = ");

    assert_eq!(config::load(file.path()), SanitizationPolicy::strict());
}

#[test]
fn malformed_keys_fall_back_individually() {
    let file = config_file(
        r#"
        [sanitizer]
        enabled = "yes"
        strip = 0
        allowed_tags = ["em"]
        "#,
    );

    let policy = config::load(file.path());

    assert!(policy.enabled());
    assert!(policy.rules().strip());
    assert!(policy.rules().allows_tag("em"));
    assert!(!policy.rules().allows_tag("b"));
}

#[test]
fn strict_policy_strips_all_markup() {
    let policy = config::resolve(None);

    let cleaned = AmmoniaCleaner
        .clean("<b>bold</b> and <a href=\"/x\">link</a>", policy.rules())
        .unwrap();

    assert_eq!(cleaned, "bold and link");
}

#[test]
fn loading_twice_is_deterministic() {
    let file = config_file("[sanitizer]\nallowed_tags = [\"u\", \"p\"]\n");

    assert_eq!(config::load(file.path()), config::load(file.path()));
}
