//! Application state management.
//!
//! ## Structure
//!
//! - `session` - Session storage and the per-request context
//! - `actions` - The connect / generate / execute flows that update it

mod actions;
mod session;

pub use actions::{App, GeneratedSql};
pub use session::{RequestContext, SessionState, SessionStore};
