//! Client-side error types.

use crate::transport::TransportError;
use fleet_core::{DeviceId, ReportError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Non-success status or refused schedule; message is user-facing.
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Success status but the body was not what the endpoint promises.
    #[error("malformed response: {0}")]
    Payload(String),
}

impl ClientError {
    /// Message to surface to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Report(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    /// HTTP status, when the failure came from the backend.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Report(ReportError::NetworkFailure { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("invalid utc offset `{0}`: expected whole minutes strictly between -1440 and 1440")]
    InvalidUtcOffset(String),
}

/// Reasons a route plan is refused or fails.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("start and end places are required")]
    EmptyPlace,

    #[error("map is not ready yet")]
    MapNotReady,

    #[error("device {0} is not in the directory")]
    UnknownDevice(DeviceId),

    #[error("device {0} has no known position")]
    NoPosition(DeviceId),

    #[error(transparent)]
    Client(#[from] ClientError),
}
