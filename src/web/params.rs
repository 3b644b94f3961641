//! Ordered multi-value containers for query parameters and form fields.

use bytes::Bytes;
use indexmap::IndexMap;

/// Ordered multi-map of query (or url-encoded form) parameters.
///
/// A key may carry several values (`?tag=a&tag=b`); keys keep first-seen order.
///
/// # Examples
///
/// ```
/// use request_sanitizer::web::ParamMap;
///
/// let params = ParamMap::parse("tag=a&q=%3Cb%3E&tag=b");
/// assert_eq!(params.get_all("tag"), ["a", "b"]);
/// assert_eq!(params.get("q"), Some("<b>"));
/// assert_eq!(params.encode(), "tag=a&tag=b&q=%3Cb%3E");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: IndexMap<String, Vec<String>>,
}

impl ParamMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an `application/x-www-form-urlencoded` string (a query string
    /// without its leading `?`, or a form body).
    pub fn parse(encoded: &str) -> Self {
        Self::parse_bytes(encoded.as_bytes())
    }

    /// Decodes url-encoded bytes. Invalid UTF-8 is replaced, not rejected.
    pub fn parse_bytes(encoded: &[u8]) -> Self {
        let mut map = Self::new();
        for (key, value) in form_urlencoded::parse(encoded) {
            map.append(key.into_owned(), value.into_owned());
        }
        map
    }

    /// Encodes back to url-encoded form. Values of one key are kept adjacent.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.entries {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    /// Adds a value under `key`, after any existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// First value under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.first().map(String::as_str)
    }

    /// All values under `key` (empty if absent).
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys with their values, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl IntoIterator for ParamMap {
    type Item = (String, Vec<String>);
    type IntoIter = indexmap::map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Vec<String>)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// An uploaded file from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied file name, if any.
    pub filename: Option<String>,
    /// Declared content type of the part, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

/// One value of a decoded form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// A text field. Cleaned unless the field is exempt.
    Text(String),
    /// A file part. Never cleaned.
    File(UploadedFile),
}

impl FormValue {
    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            FormValue::File(_) => None,
        }
    }
}

/// Decoded form fields, as produced by the host's form or multipart parser.
///
/// # Examples
///
/// ```
/// use request_sanitizer::web::{FormData, FormValue};
///
/// let mut form = FormData::new();
/// form.append_text("name", "Jenil");
/// assert_eq!(form.text("name"), Some("Jenil"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: IndexMap<String, Vec<FormValue>>,
}

impl FormData {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a text-only form from url-encoded parameters.
    pub fn from_params(params: ParamMap) -> Self {
        Self {
            fields: params
                .into_iter()
                .map(|(k, vs)| (k, vs.into_iter().map(FormValue::Text).collect()))
                .collect(),
        }
    }

    /// Text fields as url-encodable parameters. File values are left out.
    pub fn to_params(&self) -> ParamMap {
        self.fields
            .iter()
            .map(|(k, vs)| {
                (
                    k.clone(),
                    vs.iter()
                        .filter_map(|v| v.as_text().map(str::to_string))
                        .collect(),
                )
            })
            .filter(|(_, vs): &(String, Vec<String>)| !vs.is_empty())
            .collect()
    }

    /// Adds a value under `key`.
    pub fn append(&mut self, key: impl Into<String>, value: FormValue) {
        self.fields.entry(key.into()).or_default().push(value);
    }

    /// Adds a text value under `key`.
    pub fn append_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.append(key, FormValue::Text(value.into()));
    }

    /// First text value under `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.iter().find_map(FormValue::as_text)
    }

    /// All values under `key` (empty if absent).
    pub fn get_all(&self, key: &str) -> &[FormValue] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if any value is a file.
    pub fn has_files(&self) -> bool {
        self.fields
            .values()
            .flatten()
            .any(|v| matches!(v, FormValue::File(_)))
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates field names with their values, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FormValue])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl IntoIterator for FormData {
    type Item = (String, Vec<FormValue>);
    type IntoIter = indexmap::map::IntoIter<String, Vec<FormValue>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, Vec<FormValue>)> for FormData {
    fn from_iter<I: IntoIterator<Item = (String, Vec<FormValue>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
