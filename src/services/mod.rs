pub mod completion;
pub mod database;
pub mod prompt;

pub use completion::{CompletionClient, CompletionService};
pub use database::{ConnectForm, ConnectionParams, Dialect, DialectConnector};
