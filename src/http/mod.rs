//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, timeout, limits)
//!     → /proxy            proxy.rs     (fetch → rewrite → respond)
//!     → /api/*, /health   api.rs       (bookmark store, suggestions)
//!     → / and /ws upgrade websocket.rs (real-time sessions)
//!     → anything else     static shell, 404
//!     → response.rs (ApiError → JSON error body)
//! ```

pub mod api;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
