//! Request-scoped diagnostics for the sanitization pipeline.

use crate::error::SanitizationError;

/// Request-scoped logger for the sanitization pipeline.
///
/// Every event carries the request ID. Before/after notices for changed
/// strings are only emitted when the policy's `debug` flag is on; failure
/// notices are always emitted and never include payload text.
#[derive(Debug, Clone, Copy)]
pub struct DiffLog<'a> {
    request_id: &'a str,
    report_changes: bool,
}

impl<'a> DiffLog<'a> {
    /// Creates a logger for one request.
    pub fn new(request_id: &'a str, report_changes: bool) -> Self {
        Self {
            request_id,
            report_changes,
        }
    }

    /// A logger with no request context, for walks outside the middleware.
    pub fn detached(report_changes: bool) -> DiffLog<'static> {
        DiffLog {
            request_id: "-",
            report_changes,
        }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Reports a string that cleaning changed.
    pub fn changed(&self, field: Option<&str>, before: &str, after: &str) {
        if self.report_changes {
            tracing::info!(
                request_id = %self.request_id,
                field = field.unwrap_or("-"),
                before,
                after,
                "sanitizer changed value"
            );
        }
    }

    /// Reports a leaf whose cleaning failed and that was kept as-is.
    pub fn leaf_kept(&self, field: Option<&str>, err: &SanitizationError) {
        tracing::warn!(
            request_id = %self.request_id,
            field = field.unwrap_or("-"),
            kind = %err.kind(),
            "cleaning failed; keeping original value"
        );
    }

    /// Reports a request or response step that was skipped after an error.
    pub fn step_skipped(&self, step: &'static str, err: &SanitizationError) {
        tracing::warn!(
            request_id = %self.request_id,
            step,
            kind = %err.kind(),
            error = %err.message(),
            "sanitizer step skipped"
        );
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: std::fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}
