//! Connection-level and payload-level error types.

use thiserror::Error;

use crate::codes::{get_standard_error, StandardErrorCode};
use crate::payload::ErrorResponse;

/// Errors raised by a [`Connection`](crate::Connection) or its constructor.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The target address is not usable by this transport.
    #[error("URL is not compatible with WebSocket connection: {url} ({reason})")]
    InvalidUrl { url: String, reason: String },

    /// `send` was called while the connection was not open.
    #[error("connection is not open")]
    NotConnected,

    /// The opening handshake failed before the socket became ready.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The socket reported a fault after it was established.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The task owning the underlying channel has already stopped.
    #[error("underlying channel closed")]
    ChannelClosed,

    /// A payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConnectionError {
    /// Returns `true` for network conditions the layer above may recover
    /// from by reopening, as opposed to programmer errors.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Handshake(_) | Self::WebSocket(_) | Self::ChannelClosed
        )
    }
}

/// Reasons an inbound message is not a JSON-RPC payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing or unsupported `jsonrpc` version")]
    Version,

    #[error("`method` must be a string")]
    InvalidMethod,

    #[error("`params` must be an array or an object")]
    InvalidParams,

    #[error("`id` must be a string or an integer")]
    InvalidId,

    #[error("payload has neither `method` nor `id`")]
    MissingId,

    #[error("response carries both `result` and `error`")]
    AmbiguousOutcome,

    #[error("response carries neither `result` nor `error`")]
    MissingOutcome,

    #[error("malformed error object: {0}")]
    InvalidErrorObject(&'static str),
}

/// A protocol-level JSON-RPC error, as raised by method handlers above the
/// connection layer.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("RPC error {}: {}", .0.code, .0.message)]
pub struct RpcError(pub ErrorResponse);

impl RpcError {
    pub fn code(&self) -> i64 {
        self.0.code
    }

    pub fn response(&self) -> &ErrorResponse {
        &self.0
    }

    pub fn into_response(self) -> ErrorResponse {
        self.0
    }
}

impl From<ErrorResponse> for RpcError {
    fn from(response: ErrorResponse) -> Self {
        Self(response)
    }
}

impl From<StandardErrorCode> for RpcError {
    fn from(code: StandardErrorCode) -> Self {
        Self(get_standard_error(code.code()))
    }
}
