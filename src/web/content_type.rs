//! Content-type classification for sanitization dispatch.

/// The body representations the pipeline knows how to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json`
    Json,
    /// `application/x-www-form-urlencoded`
    FormUrlEncoded,
    /// `multipart/form-data`
    Multipart,
    /// `text/html`
    Html,
    /// Anything else, or no content type.
    Other,
}

impl ContentKind {
    /// Classifies a `Content-Type` header value.
    ///
    /// Matching is on the media type only, case-insensitive; parameters such
    /// as `charset` or `boundary` are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_sanitizer::web::ContentKind;
    ///
    /// assert_eq!(ContentKind::from_header("application/json; charset=utf-8"), ContentKind::Json);
    /// assert_eq!(ContentKind::from_header("Multipart/Form-Data; boundary=x"), ContentKind::Multipart);
    /// assert_eq!(ContentKind::from_header("application/jsonp"), ContentKind::Other);
    /// ```
    pub fn from_header(value: &str) -> Self {
        let essence = media_type(value);
        if essence.eq_ignore_ascii_case("application/json") {
            ContentKind::Json
        } else if essence.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            ContentKind::FormUrlEncoded
        } else if essence.eq_ignore_ascii_case("multipart/form-data") {
            ContentKind::Multipart
        } else if essence.eq_ignore_ascii_case("text/html") {
            ContentKind::Html
        } else {
            ContentKind::Other
        }
    }

    /// Returns `true` for the two form encodings.
    pub fn is_form(self) -> bool {
        matches!(self, ContentKind::FormUrlEncoded | ContentKind::Multipart)
    }
}

/// The media type of a header value, without parameters or surrounding space.
pub fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}

/// The `charset` parameter of a header value, unquoted, if present.
///
/// ```
/// use request_sanitizer::web::charset;
///
/// assert_eq!(charset("text/html; charset=\"ISO-8859-1\""), Some("ISO-8859-1"));
/// assert_eq!(charset("text/html"), None);
/// ```
pub fn charset(value: &str) -> Option<&str> {
    value.split(';').skip(1).find_map(|param| {
        let (name, val) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| val.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    })
}
