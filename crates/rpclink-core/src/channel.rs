//! In-process message-channel connection.
//!
//! The caller supplies the two primitives of whatever messaging mechanism is
//! in use (embedded-page `postMessage`, an IPC bridge, a test harness):
//! a function that posts an outbound string, and a function that registers
//! an inbound listener and optionally returns a [`Disposer`].
//!
//! Origin filtering belongs inside the caller's `add_listener`; this
//! connection accepts whatever that listener forwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::config::ConnectionOptions;
use crate::connection::{dispatch_inbound, encode_outbound, Connection, ConnectionState};
use crate::error::ConnectionError;
use crate::events::{ConnectionEvent, EventChannel, EventPublisher};
use crate::payload::Payload;

/// Inbound callback handed to the caller's `add_listener`.
pub type MessageListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Unregisters a previously registered [`MessageListener`].
pub type Disposer = Box<dyn FnOnce() + Send>;

type PostMessageFn = Box<dyn Fn(String) + Send + Sync>;
type AddMessageListenerFn = Box<dyn Fn(MessageListener) -> Option<Disposer> + Send + Sync>;

#[derive(Default)]
struct ChannelState {
    connected: bool,
    disposer: Option<Disposer>,
    /// Cleared on close. A listener the caller failed to unregister keeps
    /// running but stops publishing.
    live: Arc<AtomicBool>,
}

/// [`Connection`] over caller-supplied send/listen primitives.
///
/// Transitions are synchronous and assume a single driving context; the
/// internal lock only protects the state record, it does not serialize
/// concurrent `open`/`close` calls.
pub struct MessageChannelConnection {
    post: PostMessageFn,
    add_listener: AddMessageListenerFn,
    options: ConnectionOptions,
    events: EventPublisher,
    state: Mutex<ChannelState>,
}

impl MessageChannelConnection {
    pub fn new<P, A>(post: P, add_listener: A, options: ConnectionOptions) -> Self
    where
        P: Fn(String) + Send + Sync + 'static,
        A: Fn(MessageListener) -> Option<Disposer> + Send + Sync + 'static,
    {
        Self {
            post: Box::new(post),
            add_listener: Box::new(add_listener),
            options,
            events: EventPublisher::new(),
            state: Mutex::new(ChannelState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inbound_listener(&self, live: Arc<AtomicBool>) -> MessageListener {
        let options = self.options.clone();
        let events = self.events.clone();
        Arc::new(move |raw: &str| {
            if live.load(Ordering::Acquire) {
                dispatch_inbound(raw, &options, &events);
            } else {
                tracing::debug!("dropping message delivered to a closed message channel");
            }
        })
    }
}

#[async_trait]
impl Connection for MessageChannelConnection {
    async fn open(&self) -> Result<(), ConnectionError> {
        if self.lock_state().connected {
            return Ok(());
        }
        let live = Arc::new(AtomicBool::new(true));
        // Registered outside the lock: the caller may deliver a message
        // synchronously from inside `add_listener`.
        let disposer = (self.add_listener)(self.inbound_listener(live.clone()));
        {
            let mut state = self.lock_state();
            state.disposer = disposer;
            state.live = live;
            state.connected = true;
        }
        tracing::debug!("message channel opened");
        self.events.emit(ConnectionEvent::Open);
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        let disposer = {
            let mut state = self.lock_state();
            if !state.connected {
                return Ok(());
            }
            state.connected = false;
            state.live.store(false, Ordering::Release);
            state.disposer.take()
        };
        if let Some(dispose) = disposer {
            dispose();
        }
        tracing::debug!("message channel closed");
        self.events.emit(ConnectionEvent::Close);
        Ok(())
    }

    async fn send(&self, payload: &Payload) -> Result<(), ConnectionError> {
        if !self.lock_state().connected {
            return Err(ConnectionError::NotConnected);
        }
        let text = encode_outbound(payload, &self.options)?;
        (self.post)(text);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        if self.lock_state().connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn events(&self) -> &EventChannel {
        self.events.channel()
    }
}

impl std::fmt::Debug for MessageChannelConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("MessageChannelConnection")
            .field("connected", &state.connected)
            .field("has_disposer", &state.disposer.is_some())
            .field("options", &self.options)
            .finish()
    }
}
