//! Bookmark record and set types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::realtime::SessionId;

/// One bookmarked page. The url is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Session that created it over the real-time channel, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_session: Option<SessionId>,
}

impl Bookmark {
    pub fn new(url: impl Into<String>, title: impl Into<String>, owner_session: Option<SessionId>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            created_at: Utc::now(),
            owner_session,
        }
    }
}

/// Every bookmark in store order, serialized as `[[url, record], ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkSet(pub Vec<(String, Bookmark)>);

impl BookmarkSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&Bookmark> {
        self.0.iter().find(|(key, _)| key == url).map(|(_, b)| b)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(url, _)| url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_serializes_as_pairs() {
        let set = BookmarkSet(vec![(
            "https://a.com".to_string(),
            Bookmark::new("https://a.com", "A", None),
        )]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0][0], "https://a.com");
        assert_eq!(json[0][1]["title"], "A");
        assert!(json[0][1]["createdAt"].is_string());
        assert!(json[0][1].get("ownerSession").is_none());

        let back: BookmarkSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }
}
