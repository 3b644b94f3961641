//! Recursive, shape-preserving sanitization of [`PayloadValue`]s.

use crate::cleaner::HtmlCleaner;
use crate::logging::DiffLog;
use crate::payload::PayloadValue;
use crate::policy::SanitizationPolicy;

/// Walks payloads and cleans every string leaf not under an exempt key.
///
/// The output always has the input's shape: same keys in the same order,
/// same sequence lengths. Only `String` leaves can differ. A leaf whose
/// cleaning fails keeps its original value; the walk itself never fails.
///
/// # Examples
///
/// ```
/// use request_sanitizer::{AmmoniaCleaner, ExemptFields, PayloadValue, SanitizationPolicy, Walker};
/// use serde_json::json;
///
/// let policy = SanitizationPolicy::builder()
///     .exempt_fields(ExemptFields::credentials())
///     .build();
/// let walker = Walker::new(&policy, &AmmoniaCleaner);
///
/// let input = PayloadValue::from(json!({
///     "bio": "<script>x</script><b>hi</b>",
///     "password": "<b>keep</b>",
/// }));
/// let output = serde_json::Value::from(walker.walk(input, None));
///
/// assert_eq!(output, json!({"bio": "<b>hi</b>", "password": "<b>keep</b>"}));
/// ```
#[derive(Debug)]
pub struct Walker<'a, C: ?Sized> {
    policy: &'a SanitizationPolicy,
    cleaner: &'a C,
    log: DiffLog<'a>,
}

impl<'a, C: HtmlCleaner + ?Sized> Walker<'a, C> {
    /// Creates a walker with no request context.
    pub fn new(policy: &'a SanitizationPolicy, cleaner: &'a C) -> Self {
        Self {
            policy,
            cleaner,
            log: DiffLog::detached(policy.debug()),
        }
    }

    /// Creates a walker that logs against a request.
    pub fn with_log(policy: &'a SanitizationPolicy, cleaner: &'a C, log: DiffLog<'a>) -> Self {
        Self {
            policy,
            cleaner,
            log,
        }
    }

    /// Sanitizes `value`. `current_key` is the key `value` was found under,
    /// used for log context only; exemption is decided by enclosing mappings.
    pub fn walk(&self, value: PayloadValue, current_key: Option<&str>) -> PayloadValue {
        match value {
            PayloadValue::Mapping(map) => PayloadValue::Mapping(
                map.into_iter()
                    .map(|(key, v)| {
                        let v = self.walk_field(&key, v);
                        (key, v)
                    })
                    .collect(),
            ),
            PayloadValue::Sequence(items) => PayloadValue::Sequence(
                items
                    .into_iter()
                    .map(|item| self.walk(item, current_key))
                    .collect(),
            ),
            PayloadValue::String(text) => PayloadValue::String(self.clean_text(text, current_key)),
            other @ (PayloadValue::Null
            | PayloadValue::Bool(_)
            | PayloadValue::Number(_)
            | PayloadValue::Binary(_)) => other,
        }
    }

    /// Sanitizes a value found under `key`, leaving it untouched if `key` is exempt.
    ///
    /// Query parameters and form fields go through here so their names get
    /// the same exemption as mapping keys.
    pub fn walk_field(&self, key: &str, value: PayloadValue) -> PayloadValue {
        if self.policy.is_exempt(key) {
            return value;
        }
        self.walk(value, Some(key))
    }

    /// Sanitizes a flat text value (query parameter or form field) found under `key`.
    pub fn walk_text_field(&self, key: &str, text: String) -> String {
        if self.policy.is_exempt(key) {
            return text;
        }
        self.clean_text(text, Some(key))
    }

    /// Cleans one string leaf, falling back to the original on failure.
    pub fn clean_text(&self, text: String, field: Option<&str>) -> String {
        match self.cleaner.clean(&text, self.policy.rules()) {
            Ok(cleaned) => {
                if cleaned != text {
                    self.log.changed(field, &text, &cleaned);
                }
                cleaned
            }
            Err(err) => {
                self.log.leaf_kept(field, &err);
                text
            }
        }
    }
}
