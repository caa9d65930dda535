//! One WebSocket session from upgrade to close.
//!
//! ```text
//! upgrade → register (session id) → snapshot of current bookmarks
//!         → reader loop: text frames → ClientMessage → BookmarkStore
//!         → writer task: registry queue → socket
//! close / error / shutdown / writer gone (dropped as lagging) → unregister
//! ```

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::bookmarks::BookmarkStore;
use crate::realtime::protocol::{ClientMessage, ServerMessage};
use crate::realtime::registry::{SessionId, SessionRegistry};

/// Drive a session until the client leaves or the server shuts down.
pub async fn run_session(
    socket: WebSocket,
    registry: Arc<SessionRegistry>,
    store: Arc<BookmarkStore>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let (mut sink, mut stream) = socket.split();
    let (session_id, mut rx) = registry.register();

    store.with_current(|set| match ServerMessage::bookmarks(set).encode() {
        Ok(payload) => {
            registry.send_to(session_id, &payload);
        }
        Err(e) => tracing::error!(session_id = %session_id, error = %e, "Failed to encode snapshot"),
    });

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(payload.into())).await {
                tracing::debug!(session_id = %session_id, error = %e, "Session send failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_text(text.as_str(), &store, session_id),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session_id, error = %e, "Session read failed");
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!(session_id = %session_id, "Session writer finished");
                break;
            }
            _ = shutdown.recv() => {
                tracing::debug!(session_id = %session_id, "Closing session for shutdown");
                break;
            }
        }
    }

    registry.unregister(session_id);
    writer.abort();
}

fn handle_text(text: &str, store: &BookmarkStore, session_id: SessionId) {
    let result = ClientMessage::parse(text).and_then(|msg| msg.apply(store, session_id));
    if let Err(e) = result {
        tracing::warn!(session_id = %session_id, error = %e, "Ignoring client message");
    }
}
