use async_lock::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::database::{ConnectionParams, SchemaMap};

/// What a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub connection: Option<ConnectionParams>,
    pub schema: Option<SchemaMap>,
}

/// Per-request copy of a session's state, passed explicitly into each handler
/// and written back when the request finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub session_id: Uuid,
    pub connection: Option<ConnectionParams>,
    pub schema: Option<SchemaMap>,
}

impl RequestContext {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            connection: None,
            schema: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connection(&self) -> Result<&ConnectionParams, AppError> {
        self.connection.as_ref().ok_or(AppError::NotConnected)
    }

    pub fn schema(&self) -> Result<&SchemaMap, AppError> {
        self.schema.as_ref().ok_or(AppError::NotConnected)
    }
}

/// In-memory session storage. Contents are lost when the process exits.
///
/// Requests against the same session are not serialized: whichever request
/// finishes last wins.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let session_id = Uuid::new_v4();
        let mut guard = self.sessions.write().await;
        guard.insert(session_id, SessionState::default());
        tracing::debug!(%session_id, "Session created");
        session_id
    }

    /// Loads the context for a request. Unknown ids start out empty.
    pub async fn begin_request(&self, session_id: Uuid) -> RequestContext {
        let guard = self.sessions.read().await;
        match guard.get(&session_id) {
            Some(state) => RequestContext {
                session_id,
                connection: state.connection.clone(),
                schema: state.schema.clone(),
            },
            None => RequestContext::new(session_id),
        }
    }

    /// Writes the request's context back to its session.
    pub async fn end_request(&self, ctx: RequestContext) {
        let mut guard = self.sessions.write().await;
        guard.insert(
            ctx.session_id,
            SessionState {
                connection: ctx.connection,
                schema: ctx.schema,
            },
        );
    }

    pub async fn get(&self, session_id: Uuid) -> Option<SessionState> {
        let guard = self.sessions.read().await;
        guard.get(&session_id).cloned()
    }

    pub async fn remove(&self, session_id: Uuid) -> bool {
        let mut guard = self.sessions.write().await;
        guard.remove(&session_id).is_some()
    }
}
