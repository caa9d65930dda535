//! Forward proxy with page rewriting and shared bookmarks.

pub mod bookmarks;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod realtime;
pub mod rewrite;
pub mod security;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
