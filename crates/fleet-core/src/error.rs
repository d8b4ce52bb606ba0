//! Error taxonomy shared by the report pipeline and the route engine.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// A filter value failed its local validity check and was left out of the query.
    #[error("field `{field}` skipped: {reason}")]
    ValidationSkip { field: String, reason: String },

    /// The backend answered with a non-success status.
    #[error("{message}")]
    NetworkFailure { status: u16, message: String },

    /// An encoded path or device record could not be turned into usable data.
    #[error("decode failed: {0}")]
    DecodeFailure(String),

    /// The scheduler refused to persist the schedule. The message is kept verbatim.
    #[error("{0}")]
    SchedulePersistFailure(String),
}

impl ReportError {
    /// Message suitable for showing to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::NetworkFailure { message, .. } => message.clone(),
            Self::SchedulePersistFailure(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Extract the message from an error body.
///
/// Structured bodies (`{"message": "..."}`) yield the message field, anything
/// else yields the raw text.
pub fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("message")
            .and_then(|message| message.as_str())
            .map(|message| message.to_string())
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_body_yields_message_field() {
        assert_eq!(error_message_from_body(r#"{"message":"bad range"}"#), "bad range");
    }

    #[test]
    fn plain_body_is_surfaced_raw() {
        assert_eq!(error_message_from_body("oops"), "oops");
    }

    #[test]
    fn json_without_message_falls_back_to_raw_text() {
        let body = r#"{"error":"nope"}"#;
        assert_eq!(error_message_from_body(body), body);
    }

    #[test]
    fn network_failure_displays_message_only() {
        let err = ReportError::NetworkFailure {
            status: 400,
            message: "bad range".to_string(),
        };
        assert_eq!(err.to_string(), "bad range");
        assert_eq!(err.user_message(), "bad range");
    }
}
