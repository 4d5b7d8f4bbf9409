//! Error types for the remote control-plane client.
//!
//! Every failure that crosses the API boundary is normalised into [`ApiError`].
//! When the remote answered with a body, that body is kept as the error message
//! so operators read the service's own diagnostic.

use serde::Deserialize;
use thiserror::Error;

/// Boxed underlying cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by [`crate::RemoteApi`] implementations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote answered with a non-2xx status.
    #[error("{message}")]
    Remote {
        /// HTTP status code returned by the remote.
        status: u16,
        /// Rendered envelope, or the raw body when it is not an envelope.
        message: String,
    },

    /// The request never produced a response.
    #[error("{method} {url}: {source}")]
    Transport {
        /// HTTP method of the failed request.
        method: String,
        /// Fully qualified request URL.
        url: String,
        /// Underlying cause (DNS, connect, TLS, read, timeout).
        #[source]
        source: BoxError,
    },

    /// A 2xx response carried a payload that did not match the expected shape.
    #[error("failed decoding response from {url}: {source}")]
    Decode {
        /// Request URL whose response failed to decode.
        url: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Client configuration rejected before any request was made.
    #[error("invalid api configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Builds a remote error from a status code and the raw response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        ApiError::Remote {
            status,
            message: render_body(status, body),
        }
    }

    /// Builds a transport error from any cause.
    pub fn transport(
        method: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        ApiError::Transport {
            method: method.into(),
            url: url.into(),
            source: source.into(),
        }
    }

    /// HTTP status when the remote responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a remote 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True when no response was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

/// Structured error envelope returned by the control plane.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    /// Individual error entries.
    pub errors: Vec<ErrorEntry>,
}

/// One entry of an [`ErrorEnvelope`].
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEntry {
    /// Machine readable error code.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Request fields the error refers to.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ErrorEntry {
    fn render(&self) -> String {
        if self.fields.is_empty() {
            format!("{}: {}", self.code, self.message)
        } else {
            format!("{}: {} ({})", self.code, self.message, self.fields.join(", "))
        }
    }
}

/// Renders a non-2xx body into an error message.
///
/// Envelope bodies become `"<code>: <message> (<fields>)"` joined by `"; "`.
/// Anything else is returned verbatim. An empty body falls back to the status
/// line so the error is never blank.
pub fn render_body(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown status");
        return format!("{}: {}", status, reason.to_lowercase());
    }

    match serde_json::from_str::<ErrorEnvelope>(trimmed) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope
            .errors
            .iter()
            .map(ErrorEntry::render)
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.to_string(),
    }
}

/// Result alias used across the API crate.
pub type Result<T> = std::result::Result<T, ApiError>;
