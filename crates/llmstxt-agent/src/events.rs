//! Event channel: one producer, any number of subscribers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Events emitted while a conversation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Incremental text: model output or a tool progress notice.
    Data(String),
    /// The conversation finished without error.
    End,
    /// The conversation failed.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Data,
    End,
    Error,
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Data(_) => EventKind::Data,
            Self::End => EventKind::End,
            Self::Error(_) => EventKind::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Data(_))
    }
}

struct Subscriber {
    filter: Option<EventKind>,
    tx: mpsc::UnboundedSender<ChatEvent>,
}

/// Delivers events to every subscriber in emission order.
///
/// At most one terminal event (`End` or `Error`) is delivered; anything
/// emitted after it is dropped.
#[derive(Default)]
pub struct EventChannel {
    subscribers: Mutex<Vec<Subscriber>>,
    terminated: AtomicBool,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        self.add(None)
    }

    /// Receive only events of one kind.
    pub fn subscribe_kind(&self, kind: EventKind) -> mpsc::UnboundedReceiver<ChatEvent> {
        self.add(Some(kind))
    }

    fn add(&self, filter: Option<EventKind>) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.push(Subscriber { filter, tx });
        rx
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Deliver `event` to matching subscribers. Returns `false` when the
    /// event was dropped because a terminal event was already emitted.
    pub fn emit(&self, event: ChatEvent) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());

        if self.is_terminated() {
            warn!(kind = ?event.kind(), "Dropping event emitted after terminal event");
            return false;
        }
        if event.is_terminal() {
            self.terminated.store(true, Ordering::SeqCst);
        }

        let kind = event.kind();
        // Closed receivers are pruned as we go.
        subscribers.retain(|sub| {
            if sub.filter.is_some_and(|f| f != kind) {
                return !sub.tx.is_closed();
            }
            sub.tx.send(event.clone()).is_ok()
        });
        true
    }

    pub fn data(&self, text: impl Into<String>) -> bool {
        self.emit(ChatEvent::Data(text.into()))
    }
}
