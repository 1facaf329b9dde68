//! The `Connection` trait: the lifecycle and event contract every transport
//! must honor identically.

use async_trait::async_trait;

use crate::config::ConnectionOptions;
use crate::error::ConnectionError;
use crate::events::{ConnectionEvent, EventChannel, EventPublisher};
use crate::payload::Payload;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Handshake in flight (socket transports only).
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// A bidirectional JSON-RPC channel with an explicit lifecycle.
///
/// # Contract
/// - `open` is idempotent and emits `open` once per successful transition.
/// - `close` is idempotent and emits `close` once per transition, whether the
///   caller or the transport initiated it.
/// - `send` fails with [`ConnectionError::NotConnected`] unless connected.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn Connection>`.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    async fn open(&self) -> Result<(), ConnectionError>;

    async fn close(&self) -> Result<(), ConnectionError>;

    /// Serialize `payload` and hand it to the underlying channel.
    async fn send(&self, payload: &Payload) -> Result<(), ConnectionError>;

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// The connection's event channel.
    fn events(&self) -> &EventChannel;
}

/// Serialize an outbound payload, logging the wire text.
pub fn encode_outbound(
    payload: &Payload,
    options: &ConnectionOptions,
) -> Result<String, ConnectionError> {
    let text = payload.to_json()?;
    options.log_info(|| format!("sending: {text}"));
    Ok(text)
}

/// Handle raw inbound text: log it, validate it, and publish it as a
/// `payload` event if it is a JSON-RPC payload.
///
/// Anything else is dropped. Returns whether an event was emitted.
pub fn dispatch_inbound(raw: &str, options: &ConnectionOptions, events: &EventPublisher) -> bool {
    options.log_info(|| format!("received: {raw}"));
    match Payload::parse(raw) {
        Ok(payload) => {
            events.emit(ConnectionEvent::Payload(payload));
            true
        }
        Err(e) => {
            tracing::debug!(error = %e, "dropping inbound message that is not a JSON-RPC payload");
            false
        }
    }
}
