//! Sanitization policy: what markup survives and which fields are left alone.

use std::collections::{BTreeMap, BTreeSet};

/// Tags kept by the default policy.
pub const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "b", "i", "u", "em", "strong", "a", "br", "p", "ul", "ol", "li",
];

/// Attributes kept on `<a>` by the default policy.
pub const DEFAULT_LINK_ATTRIBUTES: &[&str] = &["href", "title", "rel"];

/// Field names in the opt-in credential preset.
pub const CREDENTIAL_FIELDS: &[&str] = &[
    "password",
    "password_confirmation",
    "token",
    "access_token",
    "refresh_token",
];

/// Markup allowlist handed to an [`HtmlCleaner`](crate::HtmlCleaner).
///
/// Tag and attribute names are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanRules {
    tags: BTreeSet<String>,
    attributes: BTreeMap<String, BTreeSet<String>>,
    strip: bool,
}

impl CleanRules {
    /// Creates rules from tag and attribute allowlists.
    pub fn new<T, S>(tags: T, attributes: BTreeMap<String, BTreeSet<String>>, strip: bool) -> Self
    where
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().to_ascii_lowercase())
                .collect(),
            attributes: attributes
                .into_iter()
                .map(|(tag, attrs)| {
                    (
                        tag.to_ascii_lowercase(),
                        attrs.iter().map(|a| a.to_ascii_lowercase()).collect(),
                    )
                })
                .collect(),
            strip,
        }
    }

    /// Returns the allowed tag names.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the per-tag attribute allowlist.
    pub fn attributes(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.attributes
    }

    /// Returns `true` when disallowed markup is deleted rather than escaped.
    pub fn strip(&self) -> bool {
        self.strip
    }

    /// Returns `true` if `tag` (any case) is allowed.
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_ascii_lowercase())
    }
}

/// Field names that are never transformed, at any nesting depth.
///
/// Matching is exact and case-sensitive, like mapping keys themselves.
///
/// # Examples
///
/// ```
/// use request_sanitizer::ExemptFields;
///
/// let exempt = ExemptFields::credentials();
/// assert!(exempt.contains("password"));
/// assert!(!exempt.contains("bio"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExemptFields {
    names: BTreeSet<String>,
}

impl ExemptFields {
    /// No exemptions.
    pub fn none() -> Self {
        Self::default()
    }

    /// The credential preset: passwords and tokens.
    pub fn credentials() -> Self {
        CREDENTIAL_FIELDS.iter().copied().collect()
    }

    /// Returns `true` if values under `field` are left untouched.
    pub fn contains(&self, field: &str) -> bool {
        self.names.contains(field)
    }

    /// Adds every name from `other`.
    pub fn extend_from(&mut self, other: &ExemptFields) {
        self.names.extend(other.names.iter().cloned());
    }

    /// Number of exempt names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing is exempt.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over exempt names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExemptFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Process-wide sanitization policy.
///
/// Built once (from configuration or [`SanitizationPolicy::builder`]) and then
/// shared read-only, typically behind an `Arc`, by every request.
///
/// # Examples
///
/// ```
/// use request_sanitizer::{ExemptFields, SanitizationPolicy};
///
/// let policy = SanitizationPolicy::builder()
///     .allowed_tags(["b", "i"])
///     .exempt_fields(ExemptFields::credentials())
///     .build();
///
/// assert!(policy.rules().allows_tag("b"));
/// assert!(policy.is_exempt("token"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationPolicy {
    rules: CleanRules,
    exempt_fields: ExemptFields,
    enabled: bool,
    sanitize_response_html: bool,
    debug: bool,
}

impl SanitizationPolicy {
    /// Starts a builder pre-loaded with the documented defaults.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// The policy used when no configuration exists at all.
    ///
    /// No tags or attributes survive, disallowed markup is stripped and
    /// nothing is exempt.
    pub fn strict() -> Self {
        Self {
            rules: CleanRules::new(Vec::<String>::new(), BTreeMap::new(), true),
            exempt_fields: ExemptFields::none(),
            enabled: true,
            sanitize_response_html: false,
            debug: false,
        }
    }

    /// Returns the markup allowlist.
    pub fn rules(&self) -> &CleanRules {
        &self.rules
    }

    /// Returns the exempt field set.
    pub fn exempt_fields(&self) -> &ExemptFields {
        &self.exempt_fields
    }

    /// Returns `true` if values under `field` must not be transformed.
    pub fn is_exempt(&self, field: &str) -> bool {
        self.exempt_fields.contains(field)
    }

    /// Master switch for the whole pipeline.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `true` if outgoing HTML responses are cleaned as well.
    pub fn sanitize_response_html(&self) -> bool {
        self.enabled && self.sanitize_response_html
    }

    /// Returns `true` if changed strings are reported in the log.
    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl Default for SanitizationPolicy {
    fn default() -> Self {
        PolicyBuilder::default().build()
    }
}

/// Builder for [`SanitizationPolicy`].
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    tags: Vec<String>,
    attributes: BTreeMap<String, BTreeSet<String>>,
    strip: bool,
    exempt_fields: ExemptFields,
    enabled: bool,
    sanitize_response_html: bool,
    debug: bool,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "a".to_string(),
            DEFAULT_LINK_ATTRIBUTES
                .iter()
                .map(|a| a.to_string())
                .collect(),
        );

        Self {
            tags: DEFAULT_ALLOWED_TAGS.iter().map(|t| t.to_string()).collect(),
            attributes,
            strip: true,
            exempt_fields: ExemptFields::none(),
            enabled: true,
            sanitize_response_html: false,
            debug: false,
        }
    }
}

impl PolicyBuilder {
    /// Replaces the allowed tag set.
    pub fn allowed_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the whole per-tag attribute allowlist.
    pub fn allowed_attributes(mut self, attributes: BTreeMap<String, BTreeSet<String>>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Allows `attributes` on `tag`, replacing any previous list for that tag.
    pub fn allow_attributes<I, S>(mut self, tag: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(tag.into(), attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Strip disallowed markup (`true`) or escape it (`false`).
    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    /// Sets the exempt field set.
    pub fn exempt_fields(mut self, exempt: ExemptFields) -> Self {
        self.exempt_fields = exempt;
        self
    }

    /// Master on/off switch.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enables post-dispatch HTML response cleaning.
    pub fn sanitize_response_html(mut self, on: bool) -> Self {
        self.sanitize_response_html = on;
        self
    }

    /// Enables before/after notices for changed strings.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Finishes the policy.
    pub fn build(self) -> SanitizationPolicy {
        SanitizationPolicy {
            rules: CleanRules::new(self.tags, self.attributes, self.strip),
            exempt_fields: self.exempt_fields,
            enabled: self.enabled,
            sanitize_response_html: self.sanitize_response_html,
            debug: self.debug,
        }
    }
}
