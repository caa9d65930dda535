//! Shared bookmark subsystem.
//!
//! # Data Flow
//! ```text
//! REST handler / WebSocket message
//!     → store.rs (add | remove | clear under one lock)
//!     → BookmarkObserver (session registry)
//!     → full BookmarkSet pushed to every open session
//! ```

pub mod store;
pub mod types;

pub use store::{BookmarkObserver, BookmarkStore, NoopObserver};
pub use types::{Bookmark, BookmarkSet};
