use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, MySqlConnection, PgConnection};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use super::backend::Database;
use crate::error::{ConnectError, DatabaseError};

/// The database products a user may connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    /// The value the connect form submits for this dialect
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "MySQL",
            Dialect::Postgres => "PostgreSQL",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::MySql => 3306,
            Dialect::Postgres => 5432,
        }
    }

    pub fn all() -> Vec<Dialect> {
        vec![Dialect::MySql, Dialect::Postgres]
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MySQL" => Ok(Dialect::MySql),
            "PostgreSQL" => Ok(Dialect::Postgres),
            other => Err(ConnectError::UnsupportedDialect(other.to_string())),
        }
    }
}

/// Raw values submitted through the connect form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectForm {
    pub dialect: String,
    pub host: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// Validated connection parameters, kept in session state so that
/// connections can be reopened on demand.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub dialect: Dialect,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("database", &self.database)
            .finish()
    }
}

impl ConnectionParams {
    /// Validates a submitted form. The dialect is checked before anything
    /// touches the network.
    pub fn from_form(form: ConnectForm) -> Result<Self, ConnectError> {
        let dialect = form.dialect.parse::<Dialect>()?;
        let (host, port) = split_host_port(form.host.trim());

        Ok(Self {
            dialect,
            host,
            port,
            username: form.username,
            password: form.password,
            database: form.database,
        })
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.dialect.default_port())
    }
}

/// Splits `host:port`. Bare IPv6 addresses (more than one colon) are left alone.
fn split_host_port(host: &str) -> (String, Option<u16>) {
    if let Some((name, port)) = host.rsplit_once(':') {
        if !name.contains(':') {
            if let Ok(port) = port.parse::<u16>() {
                return (name.to_string(), Some(port));
            }
        }
    }
    (host.to_string(), None)
}

/// An open connection to one of the supported dialects
#[derive(Debug)]
pub enum DatabaseConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
}

/// Opens a single connection (no pool) from validated parameters.
pub async fn connect(params: &ConnectionParams) -> Result<DatabaseConnection, DatabaseError> {
    tracing::info!(
        dialect = %params.dialect,
        host = %params.host,
        port = params.port(),
        database = %params.database,
        "Connecting"
    );

    let result = match params.dialect {
        Dialect::Postgres => PgConnectOptions::new()
            .host(&params.host)
            .port(params.port())
            .username(&params.username)
            .password(&params.password)
            .database(&params.database)
            .connect()
            .await
            .map(DatabaseConnection::Postgres),
        Dialect::MySql => MySqlConnectOptions::new()
            .host(&params.host)
            .port(params.port())
            .username(&params.username)
            .password(&params.password)
            .database(&params.database)
            .connect()
            .await
            .map(DatabaseConnection::MySql),
    };

    result.map_err(|e| {
        let err = DatabaseError::from(e);
        tracing::error!(kind = %err.kind, "Error Connecting: {}", err);
        err
    })
}

/// Source of fresh connections. The executor reopens one per statement.
pub trait Connector {
    type Connection: Database;

    fn connect(
        &self,
        params: &ConnectionParams,
    ) -> impl Future<Output = Result<Self::Connection, DatabaseError>> + Send;
}

/// Connects through sqlx using the dialect recorded in the parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialectConnector;

impl Connector for DialectConnector {
    type Connection = DatabaseConnection;

    async fn connect(&self, params: &ConnectionParams) -> Result<DatabaseConnection, DatabaseError> {
        connect(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(dialect: &str, host: &str) -> ConnectForm {
        ConnectForm {
            dialect: dialect.to_string(),
            host: host.to_string(),
            username: "app".to_string(),
            password: "secret".to_string(),
            database: "shop".to_string(),
        }
    }

    #[test]
    fn test_dialect_round_trip() {
        for dialect in Dialect::all() {
            assert_eq!(dialect.as_str().parse::<Dialect>().unwrap(), dialect);
        }
    }

    #[test]
    fn test_dialect_is_case_sensitive() {
        assert!("postgresql".parse::<Dialect>().is_err());
        assert!("mysql".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_unsupported_dialect_rejected() {
        let err = ConnectionParams::from_form(form("SQLite-unsupported-value", "localhost"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported database type");
        assert_eq!(
            err,
            ConnectError::UnsupportedDialect("SQLite-unsupported-value".to_string())
        );
    }

    #[test]
    fn test_host_with_port() {
        let params = ConnectionParams::from_form(form("PostgreSQL", "db.local:5433")).unwrap();
        assert_eq!(params.host, "db.local");
        assert_eq!(params.port, Some(5433));
        assert_eq!(params.port(), 5433);
    }

    #[test]
    fn test_default_ports() {
        let pg = ConnectionParams::from_form(form("PostgreSQL", "localhost")).unwrap();
        assert_eq!(pg.port(), 5432);

        let my = ConnectionParams::from_form(form("MySQL", " localhost ")).unwrap();
        assert_eq!(my.host, "localhost");
        assert_eq!(my.port(), 3306);
    }

    #[test]
    fn test_ipv6_host_kept_whole() {
        let params = ConnectionParams::from_form(form("MySQL", "::1")).unwrap();
        assert_eq!(params.host, "::1");
        assert_eq!(params.port, None);
    }

    #[test]
    fn test_debug_hides_password() {
        let params = ConnectionParams::from_form(form("MySQL", "localhost")).unwrap();
        let debug = format!("{:?}", params);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("********"));
    }
}
