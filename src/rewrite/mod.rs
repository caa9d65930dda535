//! Document rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! fetched HTML bytes + Content-Type + original page URL + proxy origin
//!     → charset.rs (document encoding)
//!     → html.rs (single lol_html pass over the document)
//!         → resolver.rs (reference → absolute / proxied URL)
//!         → bootstrap.rs (navigation-interception script)
//!     → rewritten HTML bytes, same encoding
//! ```
//!
//! # Design Decisions
//! - Pure transform: no state retained between documents
//! - A reference that fails to resolve is left as written and counted
//! - Sub-resources become absolute but are not proxied; they load directly
//!   from the origin site

pub mod bootstrap;
pub mod charset;
pub mod html;
pub mod resolver;

pub use charset::document_encoding;
pub use html::{PageRewriter, RewriteError, RewriteStats, RewrittenPage};
pub use resolver::{parse_target, resolve, to_proxied, to_proxied_at, ResolveError};
