//! Upstream fetch subsystem.
//!
//! # Data Flow
//! ```text
//! validated http/https URL
//!     → client.rs (browser headers, single attempt, deadline)
//!     → FetchedPage { final_url, content_type, body }
//!       or FetchError { Timeout | UpstreamError | NetworkError }
//! ```

pub mod client;
pub mod error;

pub use client::{is_html_content_type, FetchClient, FetchedPage};
pub use error::{FetchError, FetchResult};
