//! rpclink-core — connection contract and wire model for rpclink.
//!
//! # Overview
//!
//! rpclink lets a JSON-RPC client exchange payloads over interchangeable
//! channels through one lifecycle and event contract. The core crate defines:
//!
//! - [`Connection`] — the async lifecycle trait every transport implements
//! - [`EventChannel`] — typed `open` / `close` / `payload` / `error` events
//! - [`Payload`] — validated Request / Notification / Response wire types
//! - [`codes`] module — the standard JSON-RPC error taxonomy
//! - [`MessageChannelConnection`] — transport over caller-supplied
//!   send/listen primitives
//!
//! The WebSocket transport lives in `rpclink-ws`.

pub mod channel;
pub mod codes;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod logger;
pub mod payload;

pub use channel::{Disposer, MessageChannelConnection, MessageListener};
pub use codes::{
    get_error_by_code, get_standard_error, is_reserved_error_code, is_server_error_code,
    is_standard_error_code, standard_error_with_data, StandardErrorCode,
};
pub use config::ConnectionOptions;
pub use connection::{dispatch_inbound, encode_outbound, Connection, ConnectionState};
pub use error::{ConnectionError, PayloadError, RpcError};
pub use events::{ConnectionEvent, EventChannel, EventKind, EventPublisher, ListenerId};
pub use logger::{Logger, TracingLogger};
pub use payload::{
    ErrorResponse, Notification, Payload, PayloadKind, Request, Response, ResponseOutcome, RpcId,
};
