//! Fixed classification of HTTP and network failures.
//!
//! The table decides, per status code, whether a request is retried,
//! whether the session must be re-established, and what the user is told.
//! Status `0` stands for a network failure with no HTTP response.

use std::time::Duration;

use serde_json::Value;

use super::Severity;

/// Message shown for network failures.
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";
/// Message shown for status 500.
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
/// Message shown for statuses 502, 503, and 504.
pub const UNAVAILABLE_MESSAGE: &str =
    "Service is temporarily unavailable. Please try again later.";
/// Message shown for status 403.
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
/// Message shown for status 429.
pub const TOO_MANY_REQUESTS_MESSAGE: &str =
    "Too many requests. Please wait a moment and try again.";
/// Message shown for status 400 when the body has none.
pub const BAD_REQUEST_MESSAGE: &str = "Invalid request. Please check your input.";
/// Message shown for status 404 when the body has none.
pub const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
/// Message shown for status 409 when the body has none.
pub const CONFLICT_MESSAGE: &str = "A conflict occurred. The resource may already exist.";
/// Message shown for status 422 when the body has none.
pub const VALIDATION_MESSAGE: &str = "Validation failed. Please check your input.";
/// Message shown when nothing more specific applies.
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Default number of retries for retryable failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default base delay for linear backoff.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

/// How a failure notice is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeStyle {
    /// Notification severity.
    pub severity: Severity,
    /// Display time overriding the severity default.
    pub duration: Option<Duration>,
}

impl NoticeStyle {
    const ERROR: Self = Self {
        severity: Severity::Error,
        duration: None,
    };

    /// Presentation used for failures with `status`.
    pub const fn for_status(status: u16) -> Self {
        match status {
            0 | 502..=504 => Self {
                severity: Severity::Error,
                duration: Some(Duration::from_millis(8000)),
            },
            429 => Self {
                severity: Severity::Warning,
                duration: Some(Duration::from_millis(6000)),
            },
            _ => Self::ERROR,
        }
    }
}

/// Outcome of classifying one failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFailure {
    /// HTTP status, or `0` for a network failure.
    pub status: u16,
    /// Whether the request may be retried.
    pub retryable: bool,
    /// Whether sign-in must be triggered instead of notifying.
    pub reauthenticate: bool,
    /// User-facing message; `None` when no notification is shown.
    pub message: Option<String>,
    /// Presentation of the notice.
    pub style: NoticeStyle,
}

/// Whether a failure with `status` is transient.
pub const fn is_retryable(status: u16) -> bool {
    matches!(status, 0 | 500..=599)
}

/// Classify a failed request by status and optional JSON body.
///
/// # Examples
/// ```
/// use fleet_console::domain::http_failure::classify;
/// use serde_json::json;
///
/// let failure = classify(409, Some(&json!({ "message": "Plate already registered" })));
/// assert_eq!(failure.message.as_deref(), Some("Plate already registered"));
/// assert!(!failure.retryable);
/// ```
pub fn classify(status: u16, body: Option<&Value>) -> ClassifiedFailure {
    let message = match status {
        0 => Some(NETWORK_MESSAGE.to_owned()),
        401 => None,
        403 => Some(FORBIDDEN_MESSAGE.to_owned()),
        429 => Some(TOO_MANY_REQUESTS_MESSAGE.to_owned()),
        500 => Some(SERVER_ERROR_MESSAGE.to_owned()),
        502..=504 => Some(UNAVAILABLE_MESSAGE.to_owned()),
        400 => Some(message_or(body, BAD_REQUEST_MESSAGE)),
        404 => Some(message_or(body, NOT_FOUND_MESSAGE)),
        409 => Some(message_or(body, CONFLICT_MESSAGE)),
        422 => Some(message_or(body, VALIDATION_MESSAGE)),
        _ => Some(message_or(body, UNEXPECTED_MESSAGE)),
    };
    ClassifiedFailure {
        status,
        retryable: is_retryable(status),
        reauthenticate: status == 401,
        message,
        style: NoticeStyle::for_status(status),
    }
}

fn message_or(body: Option<&Value>, fallback: &str) -> String {
    let found = body.and_then(extract_error_message);
    found.unwrap_or_else(|| fallback.to_owned())
}

/// Pull a human-readable message out of an error body.
///
/// Checked in order: a plain string body, `message`, `error.message`,
/// `errors[0].message` (or `errors[0]` when it is a string), `detail`.
/// Empty strings are skipped.
pub fn extract_error_message(body: &Value) -> Option<String> {
    if let Some(text) = non_empty(body) {
        return Some(text);
    }
    let first_error = body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first());
    [
        body.get("message"),
        body.get("error").and_then(|error| error.get("message")),
        first_error.and_then(|error| error.get("message")),
        first_error,
        body.get("detail"),
    ]
    .into_iter()
    .flatten()
    .find_map(non_empty)
}

fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
}

/// Bounded retries with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay multiplied by the retry number.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_BASE,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }

    /// Whether retry number `retry` (1-based) may run after `status`.
    pub const fn allows(&self, status: u16, retry: u32) -> bool {
        retry <= self.max_retries && is_retryable(status)
    }
}
