//! Store traits: the storage collaborators of the core.
//!
//! The context assembler only reads through [`SummaryStore`] and
//! [`MessageStore`]. [`SessionStore`] backs the plain session operations the
//! gateway exposes. Backends report unknown identifiers through the
//! `*NotFound` variants of [`StoreError`].
//!
//! Implementations: in-memory (reference and testing).

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::message::{Message, NewMessage};
use crate::session::{Session, SessionCreate, SessionPeerConfig, SessionUpdate};
use crate::summary::{SummaryKind, SummaryRecord};

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access to derived session summaries.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// The newest summary of `kind` for the session, if one exists.
    async fn latest_summary(
        &self,
        workspace: &str,
        session: &str,
        kind: SummaryKind,
    ) -> StoreResult<Option<SummaryRecord>>;

    /// Record a new summary. Called by the derivation job, never by the core.
    async fn save_summary(
        &self,
        workspace: &str,
        session: &str,
        summary: SummaryRecord,
    ) -> StoreResult<()>;

    /// Latest long and short summaries, fetched concurrently.
    async fn latest_summaries(
        &self,
        workspace: &str,
        session: &str,
    ) -> StoreResult<(Option<SummaryRecord>, Option<SummaryRecord>)> {
        futures::try_join!(
            self.latest_summary(workspace, session, SummaryKind::Long),
            self.latest_summary(workspace, session, SummaryKind::Short),
        )
    }
}

/// Message persistence and windowed reads.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append sealed messages to a session, in order.
    async fn create_messages(
        &self,
        workspace: &str,
        session: &str,
        messages: Vec<NewMessage>,
    ) -> StoreResult<Vec<Message>>;

    /// All messages of a session in chronological order.
    async fn list_messages(&self, workspace: &str, session: &str) -> StoreResult<Vec<Message>>;

    /// The most recent messages whose summed token counts stay within
    /// `token_ceiling`. Fill order and result order are backend policy.
    async fn recent_messages(
        &self,
        workspace: &str,
        session: &str,
        token_ceiling: u32,
    ) -> StoreResult<Vec<Message>>;

    /// Messages matching `query`. `semantic` is a hint the backend may ignore.
    async fn search_messages(
        &self,
        workspace: &str,
        session: &str,
        query: &str,
        semantic: bool,
    ) -> StoreResult<Vec<Message>>;
}

/// Session lifecycle and membership.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the named session, creating it (and its workspace) when absent.
    /// Peers in `create` are added either way.
    async fn get_or_create_session(
        &self,
        workspace: &str,
        name: &str,
        create: SessionCreate,
    ) -> StoreResult<Session>;

    /// Active sessions whose metadata contains every key/value in `filter`.
    async fn list_sessions(
        &self,
        workspace: &str,
        filter: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> StoreResult<Vec<Session>>;

    async fn update_session(
        &self,
        workspace: &str,
        session: &str,
        update: SessionUpdate,
    ) -> StoreResult<Session>;

    /// Mark a session inactive.
    async fn delete_session(&self, workspace: &str, session: &str) -> StoreResult<()>;

    /// Copy a session and its messages, optionally stopping after `cutoff_message_id`.
    async fn clone_session(
        &self,
        workspace: &str,
        session: &str,
        cutoff_message_id: Option<&str>,
    ) -> StoreResult<Session>;

    async fn add_peers(
        &self,
        workspace: &str,
        session: &str,
        peers: HashMap<String, SessionPeerConfig>,
    ) -> StoreResult<()>;

    /// Replace the session's peer set.
    async fn set_peers(
        &self,
        workspace: &str,
        session: &str,
        peers: HashMap<String, SessionPeerConfig>,
    ) -> StoreResult<()>;

    async fn remove_peers(&self, workspace: &str, session: &str, peers: &[String])
    -> StoreResult<()>;

    /// Peer names in the session, sorted.
    async fn session_peers(&self, workspace: &str, session: &str) -> StoreResult<Vec<String>>;

    async fn peer_config(
        &self,
        workspace: &str,
        session: &str,
        peer: &str,
    ) -> StoreResult<SessionPeerConfig>;

    async fn set_peer_config(
        &self,
        workspace: &str,
        session: &str,
        peer: &str,
        config: SessionPeerConfig,
    ) -> StoreResult<()>;
}
