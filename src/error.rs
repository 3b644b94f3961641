use std::fmt;

/// Error raised inside the sanitization pipeline.
///
/// None of these ever reach the caller of the middleware: each one is
/// handled at a fail-open point (a leaf keeps its original value, a request
/// step is skipped, a response is left untouched). The type exists so those
/// points are explicit and can be logged.
///
/// The message never contains payload text.
///
/// # Examples
///
/// ```
/// use request_sanitizer::{SanitizationError, SanitizationErrorKind};
///
/// let error = SanitizationError::new(SanitizationErrorKind::MalformedBody, "expected value");
/// assert_eq!(error.kind(), SanitizationErrorKind::MalformedBody);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationError {
    kind: SanitizationErrorKind,
    message: String,
}

impl SanitizationError {
    /// Creates a new sanitization error.
    pub fn new(kind: SanitizationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SanitizationErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SanitizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sanitization failed ({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for SanitizationError {}

impl From<serde_json::Error> for SanitizationError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json messages carry line/column only, never the input
        let kind = if err.is_io() {
            SanitizationErrorKind::Serialization
        } else {
            SanitizationErrorKind::MalformedBody
        };
        SanitizationError::new(kind, err.to_string())
    }
}

/// Kind of sanitization error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizationErrorKind {
    /// The HTML cleaning primitive failed on a value.
    CleanerFailure,
    /// A body could not be decoded for its declared content type.
    MalformedBody,
    /// A declared character encoding is unknown or the bytes do not match it.
    UnsupportedEncoding,
    /// The raw body was consumed by a structured reader and is no longer available.
    BodyConsumed,
    /// A sanitized value could not be serialized back to bytes.
    Serialization,
}

impl fmt::Display for SanitizationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CleanerFailure => write!(f, "cleaner failure"),
            Self::MalformedBody => write!(f, "malformed body"),
            Self::UnsupportedEncoding => write!(f, "unsupported encoding"),
            Self::BodyConsumed => write!(f, "body consumed"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitization_error_creation() {
        let error = SanitizationError::new(SanitizationErrorKind::CleanerFailure, "test message");

        assert_eq!(error.kind(), SanitizationErrorKind::CleanerFailure);
        assert_eq!(error.message(), "test message");
    }

    #[test]
    fn sanitization_error_display() {
        let error = SanitizationError::new(SanitizationErrorKind::MalformedBody, "eof at line 1");

        let output = format!("{}", error);
        assert!(output.contains("sanitization failed"));
        assert!(output.contains("malformed body"));
        assert!(output.contains("eof at line 1"));
    }

    #[test]
    fn json_syntax_error_maps_to_malformed_body() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{\"a\":").unwrap_err();
        let error = SanitizationError::from(err);

        assert_eq!(error.kind(), SanitizationErrorKind::MalformedBody);
    }

    #[test]
    fn json_error_does_not_leak_input() {
        let secret = "hunter2-secret-value";
        let input = format!("{{\"password\": \"{}\"", secret);
        let err = serde_json::from_str::<serde_json::Value>(&input).unwrap_err();

        let output = format!("{}", SanitizationError::from(err));
        assert!(!output.contains(secret));
    }

    #[test]
    fn error_kinds_display() {
        assert_eq!(
            format!("{}", SanitizationErrorKind::CleanerFailure),
            "cleaner failure"
        );
        assert_eq!(
            format!("{}", SanitizationErrorKind::MalformedBody),
            "malformed body"
        );
        assert_eq!(
            format!("{}", SanitizationErrorKind::UnsupportedEncoding),
            "unsupported encoding"
        );
        assert_eq!(
            format!("{}", SanitizationErrorKind::BodyConsumed),
            "body consumed"
        );
        assert_eq!(
            format!("{}", SanitizationErrorKind::Serialization),
            "serialization"
        );
    }
}
