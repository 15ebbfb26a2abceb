//! Probe-level failures. None of these are fatal: a cycle retries the probe
//! and, once attempts run out, reconciles against an absent sample.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("server unreachable: {0}")]
    Unreachable(String),

    #[error("status exchange timed out after {0:?}")]
    TimedOut(Duration),

    #[error("response truncated: expected {expected} bytes, got {received}")]
    TruncatedResponse { expected: usize, received: usize },

    #[error("malformed varint: {0}")]
    MalformedVarint(&'static str),

    #[error("invalid response size: {0}")]
    InvalidResponseSize(i32),

    #[error("invalid status payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("missing or empty version name")]
    InvalidVersionField,
}

impl ProbeError {
    /// Short static label, handy for log lines and test assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::TimedOut(_) => "timed_out",
            Self::TruncatedResponse { .. } => "truncated_response",
            Self::MalformedVarint(_) => "malformed_varint",
            Self::InvalidResponseSize(_) => "invalid_response_size",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::InvalidVersionField => "invalid_version_field",
        }
    }
}
