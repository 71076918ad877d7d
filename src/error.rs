//! Error types shared by the HTTP client and the query layer.
//!
//! Every failed request is normalized into an [`ApiError`] carrying the
//! user-facing message that was (or would be) shown as a notification,
//! plus the HTTP status when one was received.

use thiserror::Error;

/// Default user-facing message for an unrecognized HTTP status.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred.";

/// User-facing message when no response was received at all.
pub const NETWORK_MESSAGE: &str = "Unable to reach the server. Please check your connection.";

/// Error type for API operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    ///
    /// `message` is either the `detail`/`message` field extracted from the
    /// error body or the default wording for the status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The request could not be completed (connect failure, timeout, ...).
    #[error("{0}")]
    Network(String),

    /// A 2xx body did not match the declared payload shape.
    #[error("{0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status code, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The user-facing message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Network(message) | Self::Decode(message) => message,
        }
    }
}

/// Default wording for each HTTP status the portal surfaces to users.
///
/// Unlisted statuses fall back to [`FALLBACK_MESSAGE`].
pub fn message_for_status(status: u16) -> &'static str {
    match status {
        400 => "Invalid request. Please check your input.",
        401 => "Unauthorized. Please log in again.",
        403 => "Access denied. You do not have permission.",
        404 => "Resource not found.",
        409 => "This slot is no longer available.",
        422 => "Validation error. Please check your input.",
        500 => "Something went wrong. Please try again.",
        _ => FALLBACK_MESSAGE,
    }
}

/// Pull a more specific message out of an error body, if it has one.
///
/// Backends report failures as JSON with a `detail` (FastAPI style) or
/// `message` field; anything else is ignored.
pub fn detail_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value
        .get("detail")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("message").and_then(|v| v.as_str()))?;
    if detail.is_empty() {
        None
    } else {
        Some(detail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_for_known_statuses() {
        assert_eq!(
            message_for_status(400),
            "Invalid request. Please check your input."
        );
        assert_eq!(message_for_status(401), "Unauthorized. Please log in again.");
        assert_eq!(
            message_for_status(403),
            "Access denied. You do not have permission."
        );
        assert_eq!(message_for_status(404), "Resource not found.");
        assert_eq!(message_for_status(409), "This slot is no longer available.");
        assert_eq!(
            message_for_status(422),
            "Validation error. Please check your input."
        );
        assert_eq!(
            message_for_status(500),
            "Something went wrong. Please try again."
        );
    }

    #[test]
    fn test_message_for_unknown_status_falls_back() {
        assert_eq!(message_for_status(418), FALLBACK_MESSAGE);
        assert_eq!(message_for_status(503), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_detail_from_body_prefers_detail_field() {
        let body = r#"{"detail":"Slot taken","message":"other"}"#;
        assert_eq!(detail_from_body(body), Some("Slot taken".to_string()));
    }

    #[test]
    fn test_detail_from_body_falls_back_to_message_field() {
        let body = r#"{"message":"Bad input"}"#;
        assert_eq!(detail_from_body(body), Some("Bad input".to_string()));
    }

    #[test]
    fn test_detail_from_body_ignores_unparseable() {
        assert_eq!(detail_from_body("not json"), None);
        assert_eq!(detail_from_body(r#"{"error":"nope"}"#), None);
        assert_eq!(detail_from_body(r#"{"detail":""}"#), None);
    }

    #[test]
    fn test_api_error_accessors() {
        let err = ApiError::Status {
            status: 409,
            message: "This slot is no longer available.".to_string(),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.message(), "This slot is no longer available.");
        assert_eq!(err.to_string(), "This slot is no longer available.");

        let err = ApiError::Network(NETWORK_MESSAGE.to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.message(), NETWORK_MESSAGE);
    }
}
