//! WebSocket-backed [`Connection`].
//!
//! `open` performs the handshake and hands the socket to a background task
//! that owns it until the connection closes. Lifecycle transitions are
//! serialized by a per-instance async mutex; the socket task takes the same
//! mutex before folding a remote close or a fault into the close path.
//!
//! Inbound frames pass through a per-socket gate that teardown shuts before
//! publishing `close`, so no `payload` event follows the `close` of its
//! socket.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use rpclink_core::{
    dispatch_inbound, encode_outbound, Connection, ConnectionError, ConnectionEvent,
    ConnectionOptions, ConnectionState, EventChannel, EventPublisher, Payload,
};

use crate::address::validate_url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Instruction for the socket task, in send order.
enum Outbound {
    Frame(Message),
    Shutdown,
}

/// Whether the socket task may still publish inbound payloads.
type Gate = Arc<Mutex<bool>>;

fn lock_gate(gate: &Mutex<bool>) -> MutexGuard<'_, bool> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the live socket task.
struct SocketLink {
    generation: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    gate: Gate,
}

impl SocketLink {
    /// Stop inbound delivery and tell the task to close the socket. Waits
    /// for a delivery already in progress.
    fn shut(self) {
        *lock_gate(&self.gate) = false;
        let _ = self.outbound.send(Outbound::Shutdown);
    }
}

#[derive(Default)]
struct Slot {
    state: ConnectionState,
    generation: u64,
    link: Option<SocketLink>,
}

struct Inner {
    url: String,
    /// Held for the whole of every open/close transition.
    lifecycle: tokio::sync::Mutex<()>,
    slot: Mutex<Slot>,
    events: EventPublisher,
    options: ConnectionOptions,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.slot()
            .link
            .as_ref()
            .is_some_and(|link| link.generation == generation)
    }

    /// Release the socket and publish `close`. Callers hold `lifecycle`.
    ///
    /// With `origin` set, only the link of that generation is torn down, so a
    /// task outliving its connection cannot close a newer one. An explicit
    /// teardown with no link only settles a leftover `Connecting` state.
    fn teardown(&self, origin: Option<u64>) -> bool {
        let link = {
            let mut slot = self.slot();
            if slot.link.is_none() {
                if origin.is_none() {
                    slot.state = ConnectionState::Disconnected;
                }
                return false;
            }
            let matches = match (&slot.link, origin) {
                (Some(link), Some(generation)) => link.generation == generation,
                _ => true,
            };
            if !matches {
                return false;
            }
            slot.state = ConnectionState::Disconnected;
            slot.link.take()
        };
        if let Some(link) = link {
            link.shut();
        }
        self.events.emit(ConnectionEvent::Close);
        true
    }
}

/// Puts the state back to `Disconnected` if an `open` is abandoned
/// mid-handshake (its future dropped by a timeout or `select!`).
struct HandshakeGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl HandshakeGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for HandshakeGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.inner.slot();
        if slot.state == ConnectionState::Connecting {
            slot.state = ConnectionState::Disconnected;
        }
    }
}

/// JSON-RPC connection over a WebSocket.
///
/// No reconnect and no queuing while disconnected: `send` fails unless the
/// socket is open, and a dropped socket stays closed until `open` is called
/// again.
pub struct WsConnection {
    inner: Arc<Inner>,
}

impl WsConnection {
    /// Validate `url` and build an inert connection.
    ///
    /// Fails with [`ConnectionError::InvalidUrl`] unless `url` is a `ws://` or
    /// `wss://` address; nothing is allocated on the network side until
    /// [`Connection::open`].
    pub fn new(
        url: impl Into<String>,
        options: ConnectionOptions,
    ) -> Result<Self, ConnectionError> {
        let url = url.into();
        validate_url(&url)?;
        Ok(Self {
            inner: Arc::new(Inner {
                url,
                lifecycle: tokio::sync::Mutex::new(()),
                slot: Mutex::new(Slot::default()),
                events: EventPublisher::new(),
                options,
            }),
        })
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn open(&self) -> Result<(), ConnectionError> {
        let _guard = self.inner.lifecycle.lock().await;
        if self.inner.slot().state == ConnectionState::Connected {
            return Ok(());
        }
        self.inner.slot().state = ConnectionState::Connecting;
        let handshake = HandshakeGuard {
            inner: &self.inner,
            armed: true,
        };

        let url = &self.inner.url;
        tracing::info!(url = %url, "connecting via WebSocket");
        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                drop(handshake);
                tracing::warn!(url = %url, error = %e, "WebSocket handshake failed");
                self.inner.options.log_error("handshake failed", &e);
                return Err(ConnectionError::Handshake(e.to_string()));
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let gate: Gate = Arc::new(Mutex::new(true));
        let generation = {
            let mut slot = self.inner.slot();
            slot.generation += 1;
            slot.state = ConnectionState::Connected;
            slot.link = Some(SocketLink {
                generation: slot.generation,
                outbound: tx,
                gate: gate.clone(),
            });
            slot.generation
        };
        handshake.disarm();
        tracing::info!(url = %url, generation, "WebSocket connected");
        self.inner.events.emit(ConnectionEvent::Open);

        tokio::spawn(socket_task(
            stream,
            rx,
            gate,
            generation,
            Arc::downgrade(&self.inner),
            self.inner.events.clone(),
            self.inner.options.clone(),
        ));
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        let _guard = self.inner.lifecycle.lock().await;
        if self.inner.teardown(None) {
            tracing::info!(url = %self.inner.url, "WebSocket closed");
        }
        Ok(())
    }

    async fn send(&self, payload: &Payload) -> Result<(), ConnectionError> {
        let outbound = self
            .inner
            .slot()
            .link
            .as_ref()
            .map(|link| link.outbound.clone())
            .ok_or(ConnectionError::NotConnected)?;
        let text = encode_outbound(payload, &self.inner.options)?;
        outbound
            .send(Outbound::Frame(Message::Text(text.into())))
            .map_err(|_| ConnectionError::ChannelClosed)
    }

    fn state(&self) -> ConnectionState {
        self.inner.slot().state
    }

    fn events(&self) -> &EventChannel {
        self.inner.events.channel()
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        let link = self.inner.slot().link.take();
        if let Some(link) = link {
            // A drop from inside a payload listener runs with the gate held.
            if let Ok(mut open) = link.gate.try_lock() {
                *open = false;
            }
            let _ = link.outbound.send(Outbound::Shutdown);
        }
    }
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection")
            .field("url", &self.inner.url)
            .field("state", &self.inner.slot().state)
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Publish one inbound message unless the socket has been shut.
fn deliver(gate: &Mutex<bool>, raw: &str, options: &ConnectionOptions, events: &EventPublisher) {
    let open = lock_gate(gate);
    if *open {
        dispatch_inbound(raw, options, events);
    }
}

/// Background task that owns one established socket.
async fn socket_task(
    stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    gate: Gate,
    generation: u64,
    inner: Weak<Inner>,
    events: EventPublisher,
    options: ConnectionOptions,
) {
    let (mut sink, mut source) = stream.split();

    let fault = loop {
        tokio::select! {
            // Local commands first, so a pending shutdown wins over a
            // backlog of inbound frames.
            biased;

            cmd = outbound.recv() => match cmd {
                Some(Outbound::Frame(msg)) => {
                    if let Err(e) = sink.send(msg).await {
                        break Some(e);
                    }
                }
                // Closed locally; the lifecycle side already published `close`.
                Some(Outbound::Shutdown) | None => {
                    let _ = sink.close().await;
                    return;
                }
            },
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    deliver(&gate, text.as_str(), &options, &events);
                }
                Some(Ok(Message::Binary(data))) => {
                    deliver(&gate, &String::from_utf8_lossy(&data), &options, &events);
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        break Some(e);
                    }
                }
                Some(Ok(Message::Close(_))) | None => break None,
                Some(Ok(_)) => {}
                Some(Err(e)) => break Some(e),
            }
        }
    };
    let _ = sink.close().await;

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let _guard = inner.lifecycle.lock().await;
    if !inner.is_current(generation) {
        return;
    }
    match fault {
        Some(e) => {
            tracing::warn!(url = %inner.url, error = %e, "WebSocket error");
            options.log_error("error", &e);
            events.emit(ConnectionEvent::Error(Arc::new(ConnectionError::WebSocket(
                e.to_string(),
            ))));
        }
        None => tracing::info!(url = %inner.url, "WebSocket closed by peer"),
    }
    inner.teardown(Some(generation));
}
