//! The process-wide bookmark map.
//!
//! # Responsibilities
//! - Own the only copy of the bookmark set
//! - Apply add / remove / clear atomically
//! - Notify the observer with the full set after every mutation
//!
//! # Design Decisions
//! - A single mutex; the observer runs while it is held so notifications
//!   leave in the same order the mutations were applied. Observers must not
//!   block (the session registry only enqueues)
//! - No diffing: every notification carries the whole set
//! - Re-adding a url replaces its record in place, keeping its position

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bookmarks::types::{Bookmark, BookmarkSet};
use crate::observability::metrics;
use crate::realtime::SessionId;

/// Receives the complete set after each mutation.
pub trait BookmarkObserver: Send + Sync {
    fn bookmarks_changed(&self, bookmarks: &BookmarkSet);
}

/// Observer that ignores notifications.
pub struct NoopObserver;

impl BookmarkObserver for NoopObserver {
    fn bookmarks_changed(&self, _bookmarks: &BookmarkSet) {}
}

/// Thread-safe, insertion-ordered bookmark store.
pub struct BookmarkStore {
    entries: Mutex<Vec<(String, Bookmark)>>,
    observer: Arc<dyn BookmarkObserver>,
}

impl BookmarkStore {
    pub fn new(observer: Arc<dyn BookmarkObserver>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            observer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, Bookmark)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, entries: &[(String, Bookmark)], action: &'static str) {
        metrics::record_bookmark_mutation(action);
        self.observer.bookmarks_changed(&BookmarkSet(entries.to_vec()));
    }

    /// Add or replace the bookmark for `url`.
    pub fn add(&self, url: &str, title: &str, owner: Option<SessionId>) -> Bookmark {
        let record = Bookmark::new(url, title, owner);
        let mut entries = self.lock();
        match entries.iter_mut().find(|(key, _)| key == url) {
            Some((_, existing)) => *existing = record.clone(),
            None => entries.push((url.to_string(), record.clone())),
        }
        tracing::info!(url = %url, title = %title, owner = ?owner, total = entries.len(), "Bookmark added");
        self.publish(&entries, "add");
        record
    }

    /// Remove the bookmark for `url`. Absent urls are not an error.
    pub fn remove(&self, url: &str) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(key, _)| key != url);
        let removed = entries.len() != before;
        tracing::info!(url = %url, removed, total = entries.len(), "Bookmark removed");
        self.publish(&entries, "remove");
        removed
    }

    /// Remove everything, notifying once.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        tracing::info!(removed, "Bookmarks cleared");
        self.publish(&entries, "clear");
        removed
    }

    /// Snapshot of the current set in store order.
    pub fn list(&self) -> BookmarkSet {
        BookmarkSet(self.lock().clone())
    }

    /// Run `f` on the current set with mutations held off, so whatever `f`
    /// sends is ordered before any later notification.
    pub fn with_current<R>(&self, f: impl FnOnce(&BookmarkSet) -> R) -> R {
        let entries = self.lock();
        f(&BookmarkSet(entries.clone()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for BookmarkStore {
    fn default() -> Self {
        Self::new(Arc::new(NoopObserver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Records every notification it receives.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<BookmarkSet>>);

    impl BookmarkObserver for Recorder {
        fn bookmarks_changed(&self, bookmarks: &BookmarkSet) {
            self.0.lock().unwrap().push(bookmarks.clone());
        }
    }

    fn store() -> (BookmarkStore, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (BookmarkStore::new(recorder.clone()), recorder)
    }

    #[test]
    fn test_add_then_list() {
        let (store, _) = store();
        store.add("https://a.com", "A", None);
        let set = store.list();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("https://a.com").unwrap().title, "A");
    }

    #[test]
    fn test_re_add_replaces_in_place() {
        let (store, _) = store();
        store.add("https://a.com", "A", None);
        store.add("https://b.com", "B", None);
        store.add("https://a.com", "A2", None);

        let set = store.list();
        assert_eq!(set.len(), 2);
        assert_eq!(set.urls().collect::<Vec<_>>(), vec!["https://a.com", "https://b.com"]);
        assert_eq!(set.get("https://a.com").unwrap().title, "A2");
    }

    #[test]
    fn test_remove_absent_is_harmless() {
        let (store, recorder) = store();
        store.add("https://a.com", "A", None);
        assert!(!store.remove("https://missing.com"));
        assert_eq!(store.list().len(), 1);
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_every_mutation_broadcasts_full_set() {
        let (store, recorder) = store();
        store.add("https://a.com", "A", None);
        store.add("https://b.com", "B", None);

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[1].urls().collect::<Vec<_>>(), vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn test_clear_broadcasts_once() {
        let (store, recorder) = store();
        for i in 0..5 {
            store.add(&format!("https://{i}.com"), "x", None);
        }
        assert_eq!(store.clear(), 5);

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 6);
        assert!(seen[5].is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_owner_is_recorded() {
        let (store, _) = store();
        let owner = SessionId::new();
        let record = store.add("https://a.com", "A", Some(owner));
        assert_eq!(record.owner_session, Some(owner));
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let (store, recorder) = store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        store.add(&format!("https://t{t}-{i}.com"), "x", None);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 200);
        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 200);
        // Notifications are ordered: each one is one entry larger than the last.
        for (i, set) in seen.iter().enumerate() {
            assert_eq!(set.len(), i + 1);
        }
    }
}
