use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use crate::error::{SanitizationError, SanitizationErrorKind};
use crate::policy::CleanRules;

/// Elements whose text content is removed together with the tag.
const CONTENT_REMOVING_TAGS: &[&str] = &["script", "style"];

/// Trait for cleaning markup out of a single string.
///
/// `HtmlCleaner` is the boundary to the allowlist-based cleaning primitive.
/// The rest of the crate only relies on this contract:
///
/// - Elements not in [`CleanRules::tags`] are removed (`strip`) or rendered
///   as escaped, inert text (`!strip`)
/// - Retained elements lose every attribute not listed for their tag
/// - Cleaning already-clean output is a no-op
///
/// # Invariants
///
/// Implementations MUST:
/// - Return `Err(SanitizationError)` instead of panicking
/// - Not include the input text in errors
///
/// # Examples
///
/// ```
/// use request_sanitizer::{HtmlCleaner, AmmoniaCleaner, SanitizationPolicy};
///
/// let policy = SanitizationPolicy::default();
/// let cleaned = AmmoniaCleaner
///     .clean("<script>alert(1)</script><b>bold</b>", policy.rules())
///     .unwrap();
///
/// assert_eq!(cleaned, "<b>bold</b>");
/// ```
pub trait HtmlCleaner: Send + Sync {
    /// Cleans `text` according to `rules`.
    ///
    /// # Errors
    ///
    /// Returns `SanitizationError` with kind `CleanerFailure` if the
    /// primitive could not process the input.
    fn clean(&self, text: &str, rules: &CleanRules) -> Result<String, SanitizationError>;
}

impl<C: HtmlCleaner + ?Sized> HtmlCleaner for &C {
    fn clean(&self, text: &str, rules: &CleanRules) -> Result<String, SanitizationError> {
        (**self).clean(text, rules)
    }
}

/// An [`HtmlCleaner`] backed by `ammonia`.
///
/// - No generic (all-tag) attributes are allowed
/// - `rel` is never injected on links, so `rel` may itself be allowlisted
/// - Comments are stripped
/// - `<script>` and `<style>` are removed with their content unless allowlisted
///
/// With `strip` off, disallowed tag tokens are first rewritten to escaped text,
/// then the allowlist pass filters attributes on the tags that remain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmmoniaCleaner;

impl AmmoniaCleaner {
    fn run(text: &str, rules: &CleanRules) -> String {
        let tags: HashSet<&str> = rules.tags().iter().map(String::as_str).collect();
        let tag_attributes: HashMap<&str, HashSet<&str>> = rules
            .attributes()
            .iter()
            .filter(|(tag, _)| tags.contains(tag.as_str()))
            .map(|(tag, attrs)| (tag.as_str(), attrs.iter().map(String::as_str).collect()))
            .collect();
        let content_removing: HashSet<&str> = CONTENT_REMOVING_TAGS
            .iter()
            .copied()
            .filter(|t| !tags.contains(t))
            .collect();

        let input = if rules.strip() {
            std::borrow::Cow::Borrowed(text)
        } else {
            std::borrow::Cow::Owned(escape_disallowed_tags(text, rules))
        };

        ammonia::Builder::default()
            .tags(tags)
            .tag_attributes(tag_attributes)
            .generic_attributes(HashSet::new())
            .clean_content_tags(content_removing)
            .link_rel(None)
            .strip_comments(true)
            .clean(&input)
            .to_string()
    }
}

impl HtmlCleaner for AmmoniaCleaner {
    fn clean(&self, text: &str, rules: &CleanRules) -> Result<String, SanitizationError> {
        // Fast path: nothing that could be markup or an entity.
        if !text.contains(['<', '>', '&']) {
            return Ok(text.to_string());
        }

        panic::catch_unwind(AssertUnwindSafe(|| Self::run(text, rules))).map_err(|_| {
            SanitizationError::new(
                SanitizationErrorKind::CleanerFailure,
                "html cleaner panicked",
            )
        })
    }
}

/// Rewrites every tag token whose name is not allowed into escaped text.
///
/// A tag token starts at `<` followed by a letter (or `/` and a letter) and
/// ends at the next `>` outside quotes, or at the end of input.
fn escape_disallowed_tags(text: &str, rules: &CleanRules) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let name_start = if bytes.get(i + 1) == Some(&b'/') { i + 2 } else { i + 1 };
        if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
            continue;
        }

        let name_end = bytes[name_start..]
            .iter()
            .position(|b| !(b.is_ascii_alphanumeric() || *b == b'-'))
            .map_or(bytes.len(), |p| name_start + p);
        let end = tag_end(bytes, name_end);

        if !rules.allows_tag(&text[name_start..name_end]) {
            out.push_str(&text[last..i]);
            push_escaped(&mut out, &text[i..end]);
            last = end;
        }
        i = end;
    }

    out.push_str(&text[last..]);
    out
}

/// Index one past the `>` closing a tag, or `bytes.len()` if unterminated.
///
/// A quote only opens a value when it is the first non-space byte after `=`.
fn tag_end(bytes: &[u8], from: usize) -> usize {
    let mut quote: Option<u8> = None;
    let mut after_equals = false;
    for (offset, &b) in bytes[from..].iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'>' => return from + offset + 1,
            b'=' => after_equals = true,
            b'"' | b'\'' if after_equals => {
                quote = Some(b);
                after_equals = false;
            }
            b if b.is_ascii_whitespace() => {}
            _ => after_equals = false,
        }
    }
    bytes.len()
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
