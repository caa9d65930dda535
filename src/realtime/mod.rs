//! Real-time bookmark synchronization.
//!
//! # Data Flow
//! ```text
//! WebSocket upgrade (/ or /ws)
//!     → socket.rs (session task)
//!     → registry.rs (session id, outbound queue)
//!
//! Inbound  {type:"bookmark", ...} → protocol.rs → BookmarkStore
//! Outbound BookmarkStore change   → registry.rs broadcast → every open session
//! ```
//!
//! # Design Decisions
//! - Sessions are ephemeral and own nothing; bookmarks are process-wide
//! - The full set is sent on connect and after every change

pub mod protocol;
pub mod registry;
pub mod socket;

pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{SessionId, SessionReceiver, SessionRegistry, SessionSender};
pub use socket::run_session;
