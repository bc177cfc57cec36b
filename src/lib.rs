//! Natural-language SQL assistant.
//!
//! Connects to a MySQL or PostgreSQL database, reflects its schema, asks a
//! chat-completion model to turn a request into SQL, and runs the SQL once
//! the user confirms it.

pub mod config;
pub mod error;
pub mod render;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{AppError, CompletionError, ConnectError, DatabaseError, ErrorKind};
