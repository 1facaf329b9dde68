//! rpclink-ws — WebSocket JSON-RPC connection.
//!
//! # Features
//! - `ws://` / `wss://` address validation at construction time
//! - Open/close transitions serialized per connection
//! - Remote close and socket faults folded into the regular close path
//! - Malformed inbound frames dropped without affecting the connection

pub mod address;
pub mod connection;

pub use address::{is_websocket_url, validate_url};
pub use connection::WsConnection;
