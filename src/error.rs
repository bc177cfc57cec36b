//! Error types shared by the connector, executor, completion client and
//! application handlers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a database failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Auth,
    Network,
    UnknownDatabase,
    Syntax,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Auth => "authentication",
            ErrorKind::Network => "network",
            ErrorKind::UnknownDatabase => "unknown database",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// A failure raised by the database driver. `message` is the driver's own text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DatabaseError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DatabaseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => ErrorKind::Network,
            sqlx::Error::Database(db_err) => {
                classify_sqlstate(db_err.code().as_deref(), db_err.message())
            }
            _ => ErrorKind::Other,
        };

        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Maps a SQLSTATE code (plus the message, for drivers that report none)
/// onto an [`ErrorKind`].
pub fn classify_sqlstate(code: Option<&str>, message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    match code {
        Some(code) if code.starts_with("28") => ErrorKind::Auth,
        Some("3D000") => ErrorKind::UnknownDatabase,
        // MySQL reports an unknown schema under the generic 42000 class
        _ if lower.contains("unknown database") => ErrorKind::UnknownDatabase,
        Some(code) if code.starts_with("42") => ErrorKind::Syntax,
        _ if lower.contains("syntax error") => ErrorKind::Syntax,
        _ => ErrorKind::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Unsupported database type")]
    UnsupportedDialect(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Failure modes of the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Completion request failed: {0}")]
    Transport(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Api(String),

    #[error("Failed to parse completion response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("No database connected")]
    NotConnected,

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_postgres_codes() {
        assert_eq!(
            classify_sqlstate(Some("28P01"), "password authentication failed"),
            ErrorKind::Auth
        );
        assert_eq!(
            classify_sqlstate(Some("3D000"), "database \"nope\" does not exist"),
            ErrorKind::UnknownDatabase
        );
        assert_eq!(
            classify_sqlstate(Some("42601"), "syntax error at or near \"SELEC\""),
            ErrorKind::Syntax
        );
        assert_eq!(
            classify_sqlstate(Some("23505"), "duplicate key value"),
            ErrorKind::Other
        );
    }

    #[test]
    fn test_classify_mysql_unknown_database() {
        assert_eq!(
            classify_sqlstate(Some("42000"), "Unknown database 'shop'"),
            ErrorKind::UnknownDatabase
        );
        assert_eq!(
            classify_sqlstate(Some("28000"), "Access denied for user 'root'@'localhost'"),
            ErrorKind::Auth
        );
    }

    #[test]
    fn test_classify_without_code() {
        assert_eq!(
            classify_sqlstate(None, "near \"SELEC\": syntax error"),
            ErrorKind::Syntax
        );
        assert_eq!(classify_sqlstate(None, "disk I/O error"), ErrorKind::Other);
    }

    #[test]
    fn test_io_error_is_network() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        let db_err = DatabaseError::from(err);
        assert_eq!(db_err.kind, ErrorKind::Network);
        assert!(db_err.message.contains("connection refused"));
    }

    #[test]
    fn test_unsupported_dialect_message() {
        let err = ConnectError::UnsupportedDialect("SQLite".to_string());
        assert_eq!(err.to_string(), "Unsupported database type");
    }
}
