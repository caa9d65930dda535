//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Every response:
//!     → headers.rs (nosniff, referrer policy, frame options)
//! Every request:
//!     → body size limit (tower-http, configured in http/server.rs)
//! ```

pub mod headers;

pub use headers::apply_security_headers;
