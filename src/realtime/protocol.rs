//! Real-time wire protocol (JSON text frames).
//!
//! ```text
//! client → server  {"type":"bookmark","action":"add","url":"...","title":"..."}
//!                  {"type":"bookmark","action":"remove","url":"..."}
//!                  {"type":"bookmark","action":"clear"}
//! server → client  {"type":"bookmarks","bookmarks":[[url, record], ...]}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::bookmarks::{BookmarkSet, BookmarkStore};
use crate::realtime::registry::SessionId;

/// Inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Bookmark(BookmarkCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookmarkCommand {
    pub action: BookmarkAction,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkAction {
    Add,
    Remove,
    Clear,
}

/// Outbound message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage<'a> {
    Bookmarks { bookmarks: &'a BookmarkSet },
}

impl<'a> ServerMessage<'a> {
    pub fn bookmarks(bookmarks: &'a BookmarkSet) -> Self {
        ServerMessage::Bookmarks { bookmarks }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("bookmark {0} requires a url")]
    MissingUrl(&'static str),
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply the message to the store on behalf of `session`.
    pub fn apply(self, store: &BookmarkStore, session: SessionId) -> Result<(), ProtocolError> {
        let ClientMessage::Bookmark(command) = self;
        let url = command.url.filter(|u| !u.trim().is_empty());

        match command.action {
            BookmarkAction::Add => {
                let url = url.ok_or(ProtocolError::MissingUrl("add"))?;
                let title = command
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| fallback_title(&url));
                store.add(&url, &title, Some(session));
            }
            BookmarkAction::Remove => {
                let url = url.ok_or(ProtocolError::MissingUrl("remove"))?;
                store.remove(&url);
            }
            BookmarkAction::Clear => {
                store.clear();
            }
        }
        Ok(())
    }
}

/// Hostname of the page, or the url itself when it has none.
pub fn fallback_title(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let msg = ClientMessage::parse(
            r#"{"type":"bookmark","action":"add","url":"https://a.com","title":"A"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Bookmark(BookmarkCommand {
                action: BookmarkAction::Add,
                url: Some("https://a.com".into()),
                title: Some("A".into()),
            })
        );
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse(r#"{"type":"chat","text":"hi"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"bookmark","action":"rename"}"#).is_err());
    }

    #[test]
    fn test_apply_mutates_store() {
        let store = BookmarkStore::default();
        let session = SessionId::new();

        ClientMessage::parse(r#"{"type":"bookmark","action":"add","url":"https://a.com/x"}"#)
            .unwrap()
            .apply(&store, session)
            .unwrap();
        let set = store.list();
        let record = set.get("https://a.com/x").unwrap();
        assert_eq!(record.title, "a.com");
        assert_eq!(record.owner_session, Some(session));

        ClientMessage::parse(r#"{"type":"bookmark","action":"remove","url":"https://a.com/x"}"#)
            .unwrap()
            .apply(&store, session)
            .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_apply_requires_url() {
        let store = BookmarkStore::default();
        let err = ClientMessage::parse(r#"{"type":"bookmark","action":"add","title":"A"}"#)
            .unwrap()
            .apply(&store, SessionId::new())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MissingUrl("add")));
    }

    #[test]
    fn test_encode_bookmarks() {
        let set = BookmarkSet::default();
        let json = ServerMessage::bookmarks(&set).encode().unwrap();
        assert_eq!(json, r#"{"type":"bookmarks","bookmarks":[]}"#);
    }
}
