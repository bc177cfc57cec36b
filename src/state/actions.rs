//! Actions behind the three forms: connect, generate SQL, execute SQL.
//!
//! Each action receives the request's [`RequestContext`] explicitly and
//! reads or updates the connection parameters and schema stored there.

use crate::error::{AppError, CompletionError, ConnectError};
use crate::services::completion::CompletionService;
use crate::services::database::{
    ConnectForm, ConnectionParams, Connector, Database, QueryExecutionResult, SchemaMap,
    execute_query, reflect,
};
use crate::services::prompt::{build_prompt, format_schema_for_llm};

use super::session::RequestContext;

/// Text produced for the confirmation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedSql {
    Suggestion(String),
    Failed(CompletionError),
}

impl GeneratedSql {
    /// What goes in the SQL box. A failure shows its error text, so the
    /// user can still read and replace it.
    pub fn display_text(&self) -> String {
        match self {
            GeneratedSql::Suggestion(sql) => sql.clone(),
            GeneratedSql::Failed(err) => err.to_string(),
        }
    }

    pub fn is_suggestion(&self) -> bool {
        matches!(self, GeneratedSql::Suggestion(_))
    }
}

pub struct App<C, L> {
    connector: C,
    completion: L,
}

impl<C, L> App<C, L>
where
    C: Connector,
    L: CompletionService,
{
    pub fn new(connector: C, completion: L) -> Self {
        Self {
            connector,
            completion,
        }
    }

    /// Validates the form, connects, reflects the schema and stores both
    /// the parameters and the schema in the context.
    pub async fn connect(
        &self,
        ctx: &mut RequestContext,
        form: ConnectForm,
    ) -> Result<SchemaMap, AppError> {
        let params = ConnectionParams::from_form(form)?;

        let mut conn = self
            .connector
            .connect(&params)
            .await
            .map_err(ConnectError::from)?;

        let schema = reflect(&mut conn).await;

        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close connection: {}", e);
        }

        let schema = schema.map_err(ConnectError::from)?;

        tracing::info!(
            session_id = %ctx.session_id,
            dialect = %params.dialect,
            tables = schema.len(),
            "Connected"
        );

        ctx.connection = Some(params);
        ctx.schema = Some(schema.clone());
        Ok(schema)
    }

    /// Asks the completion service for SQL answering `request`.
    pub async fn generate_sql(
        &self,
        ctx: &RequestContext,
        request: &str,
    ) -> Result<GeneratedSql, AppError> {
        let schema = ctx.schema()?;
        let prompt = build_prompt(&format_schema_for_llm(schema), request);

        tracing::debug!(prompt_len = prompt.len(), "Built prompt");

        let generated = match self.completion.complete(&prompt).await {
            Ok(sql) => GeneratedSql::Suggestion(sql),
            Err(e) => {
                tracing::warn!("Completion failed: {}", e);
                GeneratedSql::Failed(e)
            }
        };
        Ok(generated)
    }

    /// Runs confirmed SQL on a fresh connection built from the session's
    /// parameters.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        sql: &str,
    ) -> Result<QueryExecutionResult, AppError> {
        let params = ctx.connection()?;
        Ok(execute_query(&self.connector, params, sql).await)
    }
}
