//! Connected real-time sessions.
//!
//! # Responsibilities
//! - Assign session ids on connect, forget them on disconnect
//! - Fan a payload out to every open session
//! - Report the live session count
//!
//! # Design Decisions
//! - A session's transport handle is a bounded queue drained by its own
//!   writer task; enqueueing never waits, so a broadcast never blocks
//! - A session whose queue is full is lagging and is dropped from the
//!   registry; its writer drains what was queued and closes the socket
//! - Sessions whose writer has gone away are skipped silently
//! - Per-session failures never affect other sessions

use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::bookmarks::{BookmarkObserver, BookmarkSet};
use crate::observability::metrics;
use crate::realtime::protocol::ServerMessage;

/// Outbound messages queued per session when no capacity is configured.
pub const DEFAULT_SESSION_QUEUE: usize = 64;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound queue for one session.
pub type SessionSender = mpsc::Sender<String>;

/// Receiving end handed to the session's writer task.
pub type SessionReceiver = mpsc::Receiver<String>;

enum Delivery {
    Queued,
    Closed,
    Lagging,
}

/// Registry of live sessions.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionSender>,
    queue_capacity: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_queue(DEFAULT_SESSION_QUEUE)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose sessions queue at most `queue_capacity` messages.
    pub fn with_queue(queue_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Track a new session; returns its id and the queue its writer drains.
    pub fn register(&self) -> (SessionId, SessionReceiver) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = SessionId::new();
        self.sessions.insert(id, tx);
        metrics::record_sessions(self.sessions.len());
        tracing::info!(session_id = %id, sessions = self.sessions.len(), "Session registered");
        (id, rx)
    }

    /// Forget a session. Unknown ids are ignored.
    pub fn unregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        metrics::record_sessions(self.sessions.len());
        if removed {
            tracing::info!(session_id = %id, sessions = self.sessions.len(), "Session unregistered");
        }
        removed
    }

    /// Queue a payload for one session.
    pub fn send_to(&self, id: SessionId, payload: &str) -> bool {
        let delivery = match self.sessions.get(&id) {
            Some(sender) => deliver(&sender, payload),
            None => return false,
        };
        match delivery {
            Delivery::Queued => true,
            Delivery::Closed => false,
            Delivery::Lagging => {
                self.drop_lagging(&[id]);
                false
            }
        }
    }

    /// Queue a payload for every open session; returns how many accepted it.
    pub fn broadcast(&self, payload: &str) -> usize {
        let mut delivered = 0;
        let mut lagging = Vec::new();
        for entry in self.sessions.iter() {
            match deliver(entry.value(), payload) {
                Delivery::Queued => delivered += 1,
                Delivery::Closed => {}
                Delivery::Lagging => lagging.push(*entry.key()),
            }
        }
        self.drop_lagging(&lagging);

        metrics::record_broadcast(delivered);
        tracing::debug!(delivered, sessions = self.sessions.len(), "Broadcast queued");
        delivered
    }

    fn drop_lagging(&self, ids: &[SessionId]) {
        for id in ids {
            if self.sessions.remove(id).is_some() {
                metrics::record_session_dropped();
                tracing::warn!(session_id = %id, capacity = self.queue_capacity, "Dropping lagging session");
            }
        }
        if !ids.is_empty() {
            metrics::record_sessions(self.sessions.len());
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn deliver(sender: &SessionSender, payload: &str) -> Delivery {
    match sender.try_send(payload.to_string()) {
        Ok(()) => Delivery::Queued,
        Err(TrySendError::Closed(_)) => Delivery::Closed,
        Err(TrySendError::Full(_)) => Delivery::Lagging,
    }
}

impl BookmarkObserver for SessionRegistry {
    fn bookmarks_changed(&self, bookmarks: &BookmarkSet) {
        match ServerMessage::bookmarks(bookmarks).encode() {
            Ok(payload) => {
                self.broadcast(&payload);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode bookmark broadcast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let registry = SessionRegistry::new();
        let (id, _rx) = registry.register();
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_open_session() {
        let registry = SessionRegistry::new();
        let (_, mut rx1) = registry.register();
        let (_, mut rx2) = registry.register();

        assert_eq!(registry.broadcast("hello"), 2);
        assert_eq!(rx1.try_recv().unwrap(), "hello");
        assert_eq!(rx2.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_closed_session_is_skipped() {
        let registry = SessionRegistry::new();
        let (_, mut open_rx) = registry.register();
        let (closed_id, closed_rx) = registry.register();
        drop(closed_rx);

        assert_eq!(registry.broadcast("x"), 1);
        assert_eq!(open_rx.try_recv().unwrap(), "x");
        assert!(!registry.send_to(closed_id, "y"));
        // Still registered until its socket task unregisters it.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lagging_session_is_dropped_without_blocking_others() {
        let registry = SessionRegistry::with_queue(2);
        let (_, mut stalled_rx) = registry.register();
        let (_, mut active_rx) = registry.register();

        for n in 0..3 {
            let payload = n.to_string();
            registry.broadcast(&payload);
            assert_eq!(active_rx.try_recv().unwrap(), payload);
        }

        // The stalled queue filled on the third broadcast.
        assert_eq!(registry.len(), 1);
        assert_eq!(stalled_rx.try_recv().unwrap(), "0");
        assert_eq!(stalled_rx.try_recv().unwrap(), "1");
        assert!(matches!(
            stalled_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        assert_eq!(registry.broadcast("after"), 1);
        assert_eq!(active_rx.try_recv().unwrap(), "after");
    }

    #[test]
    fn test_observer_sends_bookmarks_message() {
        let registry = SessionRegistry::new();
        let (_, mut rx) = registry.register();

        registry.bookmarks_changed(&BookmarkSet::default());
        let msg: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "bookmarks");
        assert_eq!(msg["bookmarks"], serde_json::json!([]));
    }
}
