//! The request body as a single source of truth.

use std::cell::OnceCell;
use std::io;

use bytes::Bytes;
use serde_json::Value;

use crate::error::{SanitizationError, SanitizationErrorKind};

/// Raw request body plus every view derived from it.
///
/// The raw bytes, the read cursor and the cached JSON decode are owned
/// together and only change together: [`replace`](Self::replace) swaps the
/// bytes, rewinds the cursor and drops the cache in one step, so no reader
/// can observe an old decode alongside new bytes (or the reverse).
///
/// Once a structured reader has taken ownership of the stream (multipart
/// parsing), the body is marked consumed and raw access fails with
/// `BodyConsumed` instead of exposing bytes that no longer match the fields.
///
/// # Examples
///
/// ```
/// use request_sanitizer::web::RequestBody;
/// use std::io::Read;
///
/// let mut body = RequestBody::new(r#"{"a":1}"#);
/// assert_eq!(body.json().unwrap()["a"], 1);
///
/// body.replace(r#"{"a":2}"#);
/// assert_eq!(body.json().unwrap()["a"], 2);
///
/// let mut text = String::new();
/// body.read_to_string(&mut text).unwrap();
/// assert_eq!(text, r#"{"a":2}"#);
/// ```
#[derive(Debug, Default)]
pub struct RequestBody {
    raw: Bytes,
    position: usize,
    consumed: bool,
    decoded: OnceCell<Result<Value, SanitizationError>>,
}

impl RequestBody {
    /// Wraps raw body bytes.
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }

    /// Returns the raw bytes.
    ///
    /// # Errors
    ///
    /// `BodyConsumed` after [`mark_consumed`](Self::mark_consumed).
    pub fn raw(&self) -> Result<&Bytes, SanitizationError> {
        if self.consumed {
            return Err(consumed_error());
        }
        Ok(&self.raw)
    }

    /// Returns `true` if the body is empty or consumed.
    pub fn is_empty(&self) -> bool {
        self.consumed || self.raw.is_empty()
    }

    /// Returns `true` once a structured reader has taken the stream.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Decodes the body as JSON, caching the result.
    ///
    /// # Errors
    ///
    /// `MalformedBody` if the bytes are not JSON, `BodyConsumed` after
    /// [`mark_consumed`](Self::mark_consumed).
    pub fn json(&self) -> Result<&Value, SanitizationError> {
        if self.consumed {
            return Err(consumed_error());
        }
        self.decoded
            .get_or_init(|| serde_json::from_slice(&self.raw).map_err(SanitizationError::from))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Replaces the body bytes and invalidates every derived view.
    pub fn replace(&mut self, raw: impl Into<Bytes>) {
        self.raw = raw.into();
        self.position = 0;
        self.consumed = false;
        self.decoded = OnceCell::new();
    }

    /// Serializes `value` as the new body and seeds the decode cache with it.
    ///
    /// # Errors
    ///
    /// `Serialization` if `value` cannot be encoded; the body is unchanged then.
    pub fn replace_json(&mut self, value: Value) -> Result<(), SanitizationError> {
        let raw = serde_json::to_vec(&value).map_err(|err| {
            SanitizationError::new(SanitizationErrorKind::Serialization, err.to_string())
        })?;
        self.replace(raw);
        // Freshly created above, so the cell is empty.
        let _ = self.decoded.set(Ok(value));
        Ok(())
    }

    /// Marks the raw stream as taken by a structured reader.
    pub fn mark_consumed(&mut self) {
        self.consumed = true;
        self.position = 0;
        self.decoded = OnceCell::new();
    }

    /// Returns the raw bytes, or `None` if consumed.
    pub fn into_bytes(self) -> Option<Bytes> {
        (!self.consumed).then_some(self.raw)
    }
}

impl io::Read for RequestBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.consumed {
            return Err(io::Error::other(consumed_error()));
        }
        let remaining = &self.raw[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

fn consumed_error() -> SanitizationError {
    SanitizationError::new(
        SanitizationErrorKind::BodyConsumed,
        "raw body was consumed by a structured reader",
    )
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use serde_json::json;

    #[test]
    fn json_decode_is_cached_until_replace() {
        let mut body = RequestBody::new(r#"{"v":"old"}"#);
        assert_eq!(body.json().unwrap()["v"], "old");

        body.replace(r#"{"v":"new"}"#);

        assert_eq!(body.json().unwrap()["v"], "new");
        assert_eq!(body.raw().unwrap().as_ref(), br#"{"v":"new"}"#);
    }

    #[test]
    fn malformed_json_reports_error_every_time() {
        let body = RequestBody::new("{bad json");

        let first = body.json().unwrap_err();
        let second = body.json().unwrap_err();

        assert_eq!(first.kind(), SanitizationErrorKind::MalformedBody);
        assert_eq!(first, second);
    }

    #[test]
    fn replace_rewinds_partial_read() {
        let mut body = RequestBody::new("original-bytes");
        let mut head = [0u8; 4];
        body.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"orig");

        body.replace("sanitized");

        let mut all = String::new();
        body.read_to_string(&mut all).unwrap();
        assert_eq!(all, "sanitized");
    }

    #[test]
    fn replace_json_keeps_bytes_and_cache_consistent() {
        let mut body = RequestBody::new(r#"{"bio":"<script>x</script>"}"#);
        let _ = body.json().unwrap();

        body.replace_json(json!({"bio": ""})).unwrap();

        let reparsed: Value = serde_json::from_slice(body.raw().unwrap()).unwrap();
        assert_eq!(&reparsed, body.json().unwrap());
        assert_eq!(reparsed, json!({"bio": ""}));
    }

    #[test]
    fn consumed_body_refuses_every_read() {
        let mut body = RequestBody::new("a=<script>");
        body.mark_consumed();

        assert_eq!(
            body.raw().unwrap_err().kind(),
            SanitizationErrorKind::BodyConsumed
        );
        assert!(body.json().is_err());
        assert!(body.read(&mut [0u8; 8]).is_err());
        assert!(body.is_empty());
        assert!(body.into_bytes().is_none());
    }

    #[test]
    fn raw_access_through_mut_and_owned_receivers() {
        // `Read` is in scope here, so these calls must not resolve to a byte iterator.
        let mut body = RequestBody::new("abc");
        let by_mut = &mut body;
        assert_eq!(by_mut.raw().unwrap().as_ref(), b"abc");

        let mut head = [0u8; 1];
        by_mut.read_exact(&mut head).unwrap();
        assert_eq!(body.raw().unwrap().as_ref(), b"abc");
    }

    #[test]
    fn empty_body() {
        let body = RequestBody::default();

        assert!(body.is_empty());
        assert!(!body.is_consumed());
    }
}
