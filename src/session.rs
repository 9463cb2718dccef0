//! Persistence of resume state across connection attempts and process
//! restarts.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Mutex,
};

/// Resume state for a single shard, as returned by a gateway's `Hello`/
/// `Ready` exchange.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionInfo {
    /// Session ID granted by the gateway on identify.
    pub session_id: Box<str>,
    /// URL to reconnect and resume to, if the gateway advertised one.
    pub resume_gateway_url: Option<Box<str>>,
}

impl SessionInfo {
    /// Create new session info.
    pub fn new(session_id: impl Into<Box<str>>, resume_gateway_url: Option<Box<str>>) -> Self {
        Self {
            session_id: session_id.into(),
            resume_gateway_url,
        }
    }
}

/// Durable storage for the sequence number and session info a [`Shard`]
/// needs to resume after a restart.
///
/// Implementations are consulted on every connection attempt. A read
/// failure is treated as "no prior session" and logged as a warning; a
/// write failure fails the current connection attempt, since an
/// un-persisted sequence number would desynchronize the next resume.
///
/// [`Shard`]: crate::Shard
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the last sequence number observed for a shard, if any.
    async fn get_seq(&self, shard: crate::config::ShardId) -> Result<Option<u64>, StoreError>;

    /// Persist the last sequence number observed for a shard.
    async fn set_seq(&self, shard: crate::config::ShardId, seq: u64) -> Result<(), StoreError>;

    /// Fetch the session info for a shard, if any.
    async fn get_session(&self, shard: crate::config::ShardId) -> Result<Option<SessionInfo>, StoreError>;

    /// Persist the session info for a shard, replacing any prior value.
    async fn set_session(
        &self,
        shard: crate::config::ShardId,
        session: SessionInfo,
    ) -> Result<(), StoreError>;
}

/// Error returned by a [`SessionStore`] operation.
#[derive(Debug)]
pub struct StoreError {
    /// Underlying cause, e.g. an I/O or network error from a backing store.
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    /// Wrap an arbitrary error as a store failure.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("session store operation failed")
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

/// In-process [`SessionStore`] backed by a `HashMap`.
///
/// Does not survive a process restart; useful for tests and for bots that
/// accept a cold reconnect on every deploy.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    /// Sequence numbers, keyed by shard index.
    seqs: Mutex<HashMap<u32, u64>>,
    /// Session info, keyed by shard index.
    sessions: Mutex<HashMap<u32, SessionInfo>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_seq(&self, shard: crate::config::ShardId) -> Result<Option<u64>, StoreError> {
        Ok(self.seqs.lock().unwrap().get(&shard.index()).copied())
    }

    async fn set_seq(&self, shard: crate::config::ShardId, seq: u64) -> Result<(), StoreError> {
        self.seqs.lock().unwrap().insert(shard.index(), seq);

        Ok(())
    }

    async fn get_session(&self, shard: crate::config::ShardId) -> Result<Option<SessionInfo>, StoreError> {
        Ok(self.sessions.lock().unwrap().get(&shard.index()).cloned())
    }

    async fn set_session(
        &self,
        shard: crate::config::ShardId,
        session: SessionInfo,
    ) -> Result<(), StoreError> {
        self.sessions.lock().unwrap().insert(shard.index(), session);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemorySessionStore, SessionInfo, SessionStore};
    use crate::config::ShardId;

    #[tokio::test]
    async fn round_trips_seq_and_session() {
        let store = InMemorySessionStore::new();
        let shard = ShardId::ONE;

        assert_eq!(None, store.get_seq(shard).await.unwrap());

        store.set_seq(shard, 42).await.unwrap();
        assert_eq!(Some(42), store.get_seq(shard).await.unwrap());

        assert_eq!(None, store.get_session(shard).await.unwrap());

        let session = SessionInfo::new("abc123", None);
        store.set_session(shard, session.clone()).await.unwrap();
        assert_eq!(Some(session), store.get_session(shard).await.unwrap());
    }
}
