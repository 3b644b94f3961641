//! Resolution of a [`SanitizationPolicy`] from TOML configuration.
//!
//! Resolution never fails. Configuration that is missing altogether yields
//! [`SanitizationPolicy::strict`]; a key that is missing or has the wrong type
//! falls back to that key's default.
//!
//! ```toml
//! [sanitizer]
//! enabled = true
//! allowed_tags = ["b", "i", "a"]
//! strip = true
//! sanitize_response_html = false
//! exempt_fields = ["password", "api_key"]
//! debug = false
//!
//! [sanitizer.allowed_attributes]
//! a = ["href", "title"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use toml::{Table, Value};
use tracing::{debug, warn};

use crate::policy::{ExemptFields, PolicyBuilder, SanitizationPolicy};

/// Name of the sub-table consulted by [`load`] and [`from_toml_str`].
pub const SECTION: &str = "sanitizer";

/// Resolves a policy from an already-parsed table.
///
/// `None` means no configuration exists and produces the strict policy.
///
/// # Examples
///
/// ```
/// use request_sanitizer::config;
///
/// let table: toml::Table = toml::from_str("allowed_tags = [\"b\"]").unwrap();
/// let policy = config::resolve(Some(&table));
/// assert!(policy.rules().allows_tag("b"));
/// assert!(!policy.rules().allows_tag("i"));
///
/// let strict = config::resolve(None);
/// assert!(strict.rules().tags().is_empty());
/// ```
pub fn resolve(table: Option<&Table>) -> SanitizationPolicy {
    let Some(table) = table else {
        debug!("no sanitizer configuration; using strict policy");
        return SanitizationPolicy::strict();
    };

    let mut builder = SanitizationPolicy::builder();

    if let Some(enabled) = read_bool(table, "enabled") {
        builder = builder.enabled(enabled);
    }
    if let Some(tags) = read_string_list(table, "allowed_tags") {
        builder = builder.allowed_tags(tags);
    }
    if let Some(attributes) = read_attributes(table, "allowed_attributes") {
        builder = builder.allowed_attributes(attributes);
    }
    if let Some(strip) = read_bool(table, "strip") {
        builder = builder.strip(strip);
    }
    if let Some(on) = read_bool(table, "sanitize_response_html") {
        builder = builder.sanitize_response_html(on);
    }
    if let Some(on) = read_bool(table, "debug") {
        builder = builder.debug(on);
    }
    builder = builder.exempt_fields(read_exempt_fields(table));

    finish(builder)
}

/// Resolves a policy from TOML text.
///
/// A `[sanitizer]` table is used when present, otherwise the top level.
/// Text that is not valid TOML counts as absent configuration.
pub fn from_toml_str(text: &str) -> SanitizationPolicy {
    match toml::from_str::<Table>(text) {
        Ok(root) => resolve(Some(section(&root))),
        Err(err) => {
            warn!(error = %err.message(), "invalid sanitizer configuration; using strict policy");
            resolve(None)
        }
    }
}

/// Resolves a policy from a TOML file.
///
/// A missing or unreadable file counts as absent configuration.
pub fn load(path: impl AsRef<Path>) -> SanitizationPolicy {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "sanitizer configuration file not found; using strict policy");
        return resolve(None);
    }

    match std::fs::read_to_string(path) {
        Ok(text) => from_toml_str(&text),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read sanitizer configuration; using strict policy");
            resolve(None)
        }
    }
}

fn section(root: &Table) -> &Table {
    match root.get(SECTION) {
        Some(Value::Table(inner)) => inner,
        _ => root,
    }
}

fn finish(builder: PolicyBuilder) -> SanitizationPolicy {
    let policy = builder.build();
    if policy.exempt_fields().is_empty() {
        debug!("sanitizer policy exempts no fields");
    }
    policy
}

fn read_bool(table: &Table, key: &str) -> Option<bool> {
    match table.get(key)? {
        Value::Boolean(b) => Some(*b),
        _ => {
            malformed(key);
            None
        }
    }
}

fn read_string_list(table: &Table, key: &str) -> Option<Vec<String>> {
    let Value::Array(items) = table.get(key)? else {
        malformed(key);
        return None;
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => out.push(s.clone()),
            _ => {
                malformed(key);
                return None;
            }
        }
    }
    Some(out)
}

fn read_attributes(table: &Table, key: &str) -> Option<BTreeMap<String, BTreeSet<String>>> {
    let Value::Table(by_tag) = table.get(key)? else {
        malformed(key);
        return None;
    };

    let mut out = BTreeMap::new();
    for tag in by_tag.keys() {
        let attrs = read_string_list(by_tag, tag)?;
        out.insert(tag.clone(), attrs.into_iter().collect());
    }
    Some(out)
}

fn read_exempt_fields(table: &Table) -> ExemptFields {
    let mut exempt: ExemptFields = read_string_list(table, "exempt_fields")
        .unwrap_or_default()
        .into_iter()
        .collect();

    match table.get("exempt_preset") {
        None => {}
        Some(Value::String(name)) if name == "credentials" => {
            exempt.extend_from(&ExemptFields::credentials());
        }
        Some(_) => malformed("exempt_preset"),
    }

    exempt
}

fn malformed(key: &str) {
    warn!(key, "malformed sanitizer configuration value; using default");
}
