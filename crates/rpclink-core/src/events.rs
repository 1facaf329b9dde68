//! Per-connection typed event channel.
//!
//! Four fixed channels: `open`, `close`, `payload`, `error`. Listeners are
//! plain callbacks registered per channel and removed by [`ListenerId`];
//! async consumers can instead take an [`mpsc`] receiver of every event via
//! [`EventChannel::subscribe`].
//!
//! Publishing goes through an [`EventPublisher`], which only the owning
//! connection holds; the [`EventChannel`] handed out to callers can
//! subscribe but not emit.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::error::ConnectionError;
use crate::payload::Payload;

/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The fixed set of event channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Payload,
    Error,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::Payload => write!(f, "payload"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// An event published by a connection.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Open,
    Close,
    /// A structurally valid inbound payload.
    Payload(Payload),
    /// A transport-level fault. Informational; `Close` follows.
    Error(Arc<ConnectionError>),
}

impl ConnectionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Close => EventKind::Close,
            Self::Payload(_) => EventKind::Payload,
            Self::Error(_) => EventKind::Error,
        }
    }
}

type SignalFn = Arc<dyn Fn() + Send + Sync>;
type PayloadFn = Arc<dyn Fn(&Payload) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&ConnectionError) + Send + Sync>;

#[derive(Clone)]
enum Handler {
    Signal(SignalFn),
    Payload(PayloadFn),
    Error(ErrorFn),
}

struct Entry {
    id: ListenerId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
    streams: Vec<mpsc::UnboundedSender<ConnectionEvent>>,
}

impl Registry {
    fn insert(&mut self, kind: EventKind, handler: Handler) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(Entry { id, kind, handler });
        id
    }
}

/// Listener registry for one connection. Clones share the same registry.
#[derive(Clone)]
pub struct EventChannel {
    registry: Arc<Mutex<Registry>>,
}

impl EventChannel {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_open(&self, f: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.lock().insert(EventKind::Open, Handler::Signal(Arc::new(f)))
    }

    pub fn on_close(&self, f: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.lock().insert(EventKind::Close, Handler::Signal(Arc::new(f)))
    }

    pub fn on_payload(&self, f: impl Fn(&Payload) + Send + Sync + 'static) -> ListenerId {
        self.lock().insert(EventKind::Payload, Handler::Payload(Arc::new(f)))
    }

    pub fn on_error(&self, f: impl Fn(&ConnectionError) + Send + Sync + 'static) -> ListenerId {
        self.lock().insert(EventKind::Error, Handler::Error(Arc::new(f)))
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let before = registry.entries.len();
        registry.entries.retain(|e| e.id != id);
        registry.entries.len() != before
    }

    /// Receive every event on an unbounded channel.
    ///
    /// Dropping the receiver unsubscribes it on the next publish.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().streams.push(tx);
        rx
    }

    /// Number of callback listeners registered on `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock().entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Callbacks run outside the registry lock, so they may register or
    /// remove listeners themselves.
    fn publish(&self, event: ConnectionEvent) {
        let kind = event.kind();
        let (handlers, streams) = {
            let mut registry = self.lock();
            registry.streams.retain(|tx| !tx.is_closed());
            let handlers: Vec<Handler> = registry
                .entries
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.handler.clone())
                .collect();
            (handlers, registry.streams.clone())
        };

        for handler in handlers {
            match (&handler, &event) {
                (Handler::Signal(f), ConnectionEvent::Open | ConnectionEvent::Close) => f(),
                (Handler::Payload(f), ConnectionEvent::Payload(payload)) => f(payload),
                (Handler::Error(f), ConnectionEvent::Error(err)) => f(err.as_ref()),
                _ => {}
            }
        }
        for tx in streams {
            let _ = tx.send(event.clone());
        }
    }
}

/// Publishing side of an [`EventChannel`], owned by a connection.
#[derive(Clone, Debug)]
pub struct EventPublisher {
    channel: EventChannel,
}

impl EventPublisher {
    /// Create a fresh channel together with its publisher.
    pub fn new() -> Self {
        Self {
            channel: EventChannel {
                registry: Arc::new(Mutex::new(Registry::default())),
            },
        }
    }

    /// The subscribe-only view handed out to callers.
    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Publish `event` to its channel.
    pub fn emit(&self, event: ConnectionEvent) {
        self.channel.publish(event);
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.lock();
        f.debug_struct("EventChannel")
            .field("listeners", &registry.entries.len())
            .field("streams", &registry.streams.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::payload::Notification;

    #[test]
    fn dispatches_only_to_matching_channel() {
        let publisher = EventPublisher::new();
        let events = publisher.channel();
        let opens = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let o = opens.clone();
        events.on_open(move || {
            o.fetch_add(1, Ordering::SeqCst);
        });
        let c = closes.clone();
        events.on_close(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        publisher.emit(ConnectionEvent::Open);
        publisher.emit(ConnectionEvent::Open);
        publisher.emit(ConnectionEvent::Close);

        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_listener() {
        let publisher = EventPublisher::new();
        let events = publisher.channel();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = events.on_payload(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(events.listener_count(EventKind::Payload), 1);

        assert!(events.remove(id));
        assert!(!events.remove(id));
        publisher.emit(ConnectionEvent::Payload(Notification::new("ping", None).into()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscribe_receives_all_kinds_in_order() {
        let publisher = EventPublisher::new();
        let events = publisher.channel();
        let mut rx = events.subscribe();

        publisher.emit(ConnectionEvent::Open);
        publisher.emit(ConnectionEvent::Payload(Notification::new("ping", None).into()));
        publisher.emit(ConnectionEvent::Error(Arc::new(ConnectionError::WebSocket(
            "reset".into(),
        ))));
        publisher.emit(ConnectionEvent::Close);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::Open, EventKind::Payload, EventKind::Error, EventKind::Close]
        );
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let publisher = EventPublisher::new();
        let events = publisher.channel();
        drop(events.subscribe());
        publisher.emit(ConnectionEvent::Open);
        assert_eq!(events.lock().streams.len(), 0);
    }

    #[test]
    fn listener_may_register_from_callback() {
        let publisher = EventPublisher::new();
        let events = publisher.channel();
        let inner = events.clone();
        events.on_open(move || {
            inner.on_close(|| {});
        });
        publisher.emit(ConnectionEvent::Open);
        assert_eq!(events.listener_count(EventKind::Close), 1);
    }

    #[test]
    fn cloned_channel_observes_publisher() {
        let publisher = EventPublisher::new();
        let handed_out = publisher.channel().clone();
        let mut rx = handed_out.subscribe();

        publisher.clone().emit(ConnectionEvent::Open);

        assert_eq!(rx.try_recv().map(|e| e.kind()).ok(), Some(EventKind::Open));
    }
}
