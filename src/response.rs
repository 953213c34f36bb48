//! The `Response<T>` outcome type threaded through every parser and query.
//!
//! The wire-level parsers in this crate never panic or return `Result`:
//! every outcome — success, a retryable timeout, a definitive refusal — is
//! encoded as data. This mirrors the teacher's `ProtocolError` enum in
//! spirit, but collapses it to a single tagged status so that `engine`
//! retry logic can match on outcome shape without downcasting.

use std::fmt;

/// Tag describing how a request/response exchange concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseStatus {
    /// The value is meaningful.
    Success,
    /// A definitive negative response, or a checksum/address mismatch.
    Error,
    /// No response arrived in the allowed window. Retryable.
    Timeout,
    /// The response was too short for the expected shape. Fatal for that request.
    Truncated,
    /// The response's prefix/shape did not match. Usually a stray message; retry by draining.
    UnexpectedResponse,
    /// Caller cancellation was observed.
    Cancelled,
    /// The peer explicitly refused (high-speed switch, unlock key rejected).
    Refused,
}

impl ResponseStatus {
    /// True only for [`ResponseStatus::Success`].
    pub fn is_success(self) -> bool {
        matches!(self, ResponseStatus::Success)
    }

    /// True for the two statuses the query helper retries locally.
    pub fn is_retryable(self) -> bool {
        matches!(self, ResponseStatus::Timeout | ResponseStatus::UnexpectedResponse)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResponseStatus::Success => "success",
            ResponseStatus::Error => "error",
            ResponseStatus::Timeout => "timeout",
            ResponseStatus::Truncated => "truncated",
            ResponseStatus::UnexpectedResponse => "unexpected response",
            ResponseStatus::Cancelled => "cancelled",
            ResponseStatus::Refused => "refused",
        };
        f.write_str(s)
    }
}

/// The pair `(status, value)`.
///
/// `value` is meaningful only when `status == Success`; on failure it still
/// holds a zero/default carrier so callers that ignore status see a defined
/// object, never an absent one. A human-readable `reason` is attached where
/// the originating parser has one to give (e.g. `"key rejected"`); callers
/// that want to surface failures to a user should prefer `reason` over
/// inventing their own text from `status` alone.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub status: ResponseStatus,
    pub value: T,
    pub reason: Option<String>,
}

impl<T> Response<T> {
    pub fn success(value: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            value,
            reason: None,
        }
    }

    pub fn status_with(status: ResponseStatus, value: T, reason: impl Into<String>) -> Self {
        Self {
            status,
            value,
            reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Map the value, preserving status and reason.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            status: self.status,
            value: f(self.value),
            reason: self.reason,
        }
    }
}

impl<T: Default> Response<T> {
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            value: T::default(),
            reason: Some(reason.into()),
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: ResponseStatus::Timeout,
            value: T::default(),
            reason: None,
        }
    }

    pub fn truncated() -> Self {
        Self {
            status: ResponseStatus::Truncated,
            value: T::default(),
            reason: None,
        }
    }

    pub fn unexpected() -> Self {
        Self {
            status: ResponseStatus::UnexpectedResponse,
            value: T::default(),
            reason: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: ResponseStatus::Cancelled,
            value: T::default(),
            reason: None,
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Refused,
            value: T::default(),
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_carrier_present_on_failure() {
        let r: Response<u32> = Response::timeout();
        assert_eq!(r.status, ResponseStatus::Timeout);
        assert_eq!(r.value, 0);
    }

    #[test]
    fn retryable_statuses() {
        assert!(ResponseStatus::Timeout.is_retryable());
        assert!(ResponseStatus::UnexpectedResponse.is_retryable());
        assert!(!ResponseStatus::Error.is_retryable());
        assert!(!ResponseStatus::Success.is_retryable());
    }
}
