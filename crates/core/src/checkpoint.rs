//! The persistence boundary for sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::session::{Session, SessionId};

/// An error reported by a [`CheckpointStore`].
#[derive(Debug, thiserror::Error)]
#[error("checkpoint store failed: {message}")]
pub struct CheckpointError {
    message: String,
}

impl CheckpointError {
    /// Creates an error with a human readable message.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A store that durably records sessions.
///
/// The engine calls [`CheckpointStore::save`] after every message it appends,
/// so the store always reflects the last fully appended message. The engine
/// does not care about the backing of the store, durability beyond the
/// process lifetime is up to the implementation.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Loads the session with the given id, or `None` if it's unknown.
    async fn load(&self, id: &SessionId)
    -> Result<Option<Session>, CheckpointError>;

    /// Saves the session, replacing any earlier copy with the same id.
    async fn save(&self, session: &Session) -> Result<(), CheckpointError>;
}

/// A [`CheckpointStore`] that keeps sessions in memory.
///
/// Sessions live as long as the store does. Each engine gets its own store
/// unless one is shared explicitly.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session has been saved yet.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(
        &self,
        id: &SessionId,
    ) -> Result<Option<Session>, CheckpointError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), CheckpointError> {
        trace!(
            "saving session {} ({} messages)",
            session.id(),
            session.messages().len()
        );
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use turnloop_model::{Message, ToolCall};

    use super::*;

    #[tokio::test]
    async fn test_load_unknown() {
        let store = MemoryCheckpointStore::new();
        let loaded = store.load(&SessionId::new("missing")).await.unwrap();
        assert!(loaded.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_save_round_trip() {
        let store = MemoryCheckpointStore::new();
        let call = ToolCall::new("call:1", "list_topics", json!({}));
        let mut session = Session::new(SessionId::new("s1"));
        session.push(Message::user("What is on?"));
        session.push(Message::assistant("", vec![call.clone()]));
        session.push(Message::tool(&call, "Rust in production"));
        store.save(&session).await.unwrap();

        let loaded = store.load(session.id()).await.unwrap().unwrap();
        assert_eq!(loaded, session);

        store.save(&loaded).await.unwrap();
        let reloaded = store.load(session.id()).await.unwrap().unwrap();
        assert_eq!(reloaded, session);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_replaces() {
        let store = MemoryCheckpointStore::new();
        let mut session = Session::new(SessionId::new("s1"));
        store.save(&session).await.unwrap();
        session.push(Message::user("Hello"));
        store.save(&session).await.unwrap();

        let loaded = store.load(session.id()).await.unwrap().unwrap();
        assert_eq!(loaded.messages().len(), 1);
        assert_eq!(store.len().await, 1);
    }
}
