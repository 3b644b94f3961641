//! Framework-agnostic view of an outgoing response.

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use http::{header, HeaderMap, HeaderValue, StatusCode};

use super::content_type::{self, ContentKind};
use crate::error::{SanitizationError, SanitizationErrorKind};

/// A response the sanitizer can rewrite after the handler ran.
///
/// # Examples
///
/// ```
/// use request_sanitizer::web::{ContentKind, SanitizableResponse};
///
/// let response = SanitizableResponse::html("<p>hi</p>");
/// assert_eq!(response.content_kind(), ContentKind::Html);
/// assert_eq!(response.decode_text().unwrap(), "<p>hi</p>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SanitizableResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl SanitizableResponse {
    /// Creates a response with the given status and no headers.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// A `200 OK` with `text/html; charset=utf-8`.
    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body).with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        )
    }

    /// A `200 OK` with `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body).with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
    }

    /// Adds or replaces a header.
    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the raw `Content-Type` header, if present and valid text.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Classifies the `Content-Type` header.
    pub fn content_kind(&self) -> ContentKind {
        self.content_type()
            .map_or(ContentKind::Other, ContentKind::from_header)
    }

    /// The body's declared character encoding, UTF-8 when none is declared.
    ///
    /// # Errors
    ///
    /// `UnsupportedEncoding` if the declared charset is not a known label.
    pub fn encoding(&self) -> Result<&'static Encoding, SanitizationError> {
        match self.content_type().and_then(content_type::charset) {
            None => Ok(UTF_8),
            Some(label) => Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                SanitizationError::new(
                    SanitizationErrorKind::UnsupportedEncoding,
                    format!("unknown charset {:?}", label),
                )
            }),
        }
    }

    /// Decodes the body as text in its declared encoding.
    ///
    /// # Errors
    ///
    /// `UnsupportedEncoding` if the charset is unknown or the body contains
    /// byte sequences that are invalid in it.
    pub fn decode_text(&self) -> Result<String, SanitizationError> {
        let encoding = self.encoding()?;
        let (text, had_errors) = encoding.decode_without_bom_handling(&self.body);
        if had_errors {
            return Err(SanitizationError::new(
                SanitizationErrorKind::UnsupportedEncoding,
                format!("body is not valid {}", encoding.name()),
            ));
        }
        Ok(text.into_owned())
    }

    /// Encodes `text` in the body's declared encoding and installs it as the
    /// new body. A `Content-Length` header, if present, is updated to match.
    ///
    /// # Errors
    ///
    /// `UnsupportedEncoding` if the charset is unknown or decode-only, or
    /// `text` contains characters the encoding cannot represent.
    pub fn replace_text(&mut self, text: &str) -> Result<(), SanitizationError> {
        let encoding = self.encoding()?;
        let encoded: Vec<u8> = if encoding == UTF_16LE {
            text.encode_utf16().flat_map(u16::to_le_bytes).collect()
        } else if encoding == UTF_16BE {
            text.encode_utf16().flat_map(u16::to_be_bytes).collect()
        } else if encoding != encoding.output_encoding() {
            // encoding_rs only decodes these; writing them would change the charset
            return Err(SanitizationError::new(
                SanitizationErrorKind::UnsupportedEncoding,
                format!("cannot encode {}", encoding.name()),
            ));
        } else {
            let (encoded, _, had_errors) = encoding.encode(text);
            if had_errors {
                return Err(SanitizationError::new(
                    SanitizationErrorKind::UnsupportedEncoding,
                    format!("text cannot be represented in {}", encoding.name()),
                ));
            }
            encoded.into_owned()
        };
        self.body = Bytes::from(encoded);
        if self.headers.contains_key(header::CONTENT_LENGTH) {
            self.headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
        Ok(())
    }

    /// Splits the response into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}
