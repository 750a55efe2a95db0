//! In-memory backend: the reference store, used by tests and ephemeral deployments.

use async_trait::async_trait;
use chrono::Utc;
use colloquy_core::error::StoreError;
use colloquy_core::store::{MessageStore, SessionStore, SummaryStore};
use colloquy_core::{
    Message, NewMessage, Session, SessionCreate, SessionPeerConfig, SessionUpdate, SummaryKind,
    SummaryRecord,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

type StoreResult<T> = Result<T, StoreError>;

#[derive(Default)]
struct WorkspaceState {
    sessions: HashMap<String, SessionState>,
}

struct SessionState {
    session: Session,
    peers: BTreeMap<String, SessionPeerConfig>,
    /// Chronological.
    messages: Vec<Message>,
    /// Latest summary per kind.
    summaries: HashMap<SummaryKind, SummaryRecord>,
}

impl SessionState {
    fn new(session: Session) -> Self {
        Self {
            session,
            peers: BTreeMap::new(),
            messages: Vec::new(),
            summaries: HashMap::new(),
        }
    }
}

/// Stores everything in process memory behind one `RwLock`.
pub struct InMemoryStore {
    workspaces: Arc<RwLock<HashMap<String, WorkspaceState>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            workspaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn active<'a>(
    workspaces: &'a HashMap<String, WorkspaceState>,
    workspace: &str,
    session: &str,
) -> StoreResult<&'a SessionState> {
    workspaces
        .get(workspace)
        .ok_or_else(|| StoreError::WorkspaceNotFound(workspace.into()))?
        .sessions
        .get(session)
        .filter(|s| s.session.is_active)
        .ok_or_else(|| StoreError::SessionNotFound(session.into()))
}

fn active_mut<'a>(
    workspaces: &'a mut HashMap<String, WorkspaceState>,
    workspace: &str,
    session: &str,
) -> StoreResult<&'a mut SessionState> {
    workspaces
        .get_mut(workspace)
        .ok_or_else(|| StoreError::WorkspaceNotFound(workspace.into()))?
        .sessions
        .get_mut(session)
        .filter(|s| s.session.is_active)
        .ok_or_else(|| StoreError::SessionNotFound(session.into()))
}

fn metadata_matches(
    metadata: &serde_json::Map<String, serde_json::Value>,
    filter: &serde_json::Map<String, serde_json::Value>,
) -> bool {
    filter.iter().all(|(k, v)| metadata.get(k) == Some(v))
}

#[async_trait]
impl SummaryStore for InMemoryStore {
    async fn latest_summary(
        &self,
        workspace: &str,
        session: &str,
        kind: SummaryKind,
    ) -> StoreResult<Option<SummaryRecord>> {
        let workspaces = self.workspaces.read().await;
        let state = active(&workspaces, workspace, session)?;
        Ok(state.summaries.get(&kind).cloned())
    }

    async fn save_summary(
        &self,
        workspace: &str,
        session: &str,
        summary: SummaryRecord,
    ) -> StoreResult<()> {
        let mut workspaces = self.workspaces.write().await;
        let state = active_mut(&mut workspaces, workspace, session)?;
        state.summaries.insert(summary.kind, summary);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn create_messages(
        &self,
        workspace: &str,
        session: &str,
        messages: Vec<NewMessage>,
    ) -> StoreResult<Vec<Message>> {
        let mut workspaces = self.workspaces.write().await;
        let state = active_mut(&mut workspaces, workspace, session)?;

        let mut created = Vec::with_capacity(messages.len());
        for message in messages {
            // Authors join the session on their first message.
            state
                .peers
                .entry(message.peer_name().to_string())
                .or_default();
            let stored = message.into_message(workspace, session);
            state.messages.push(stored.clone());
            created.push(stored);
        }
        Ok(created)
    }

    async fn list_messages(&self, workspace: &str, session: &str) -> StoreResult<Vec<Message>> {
        let workspaces = self.workspaces.read().await;
        Ok(active(&workspaces, workspace, session)?.messages.clone())
    }

    /// Newest-first until the next message would exceed the ceiling, then
    /// returned oldest-first. The window is contiguous: one oversized
    /// message ends it even if older, smaller ones would still fit.
    async fn recent_messages(
        &self,
        workspace: &str,
        session: &str,
        token_ceiling: u32,
    ) -> StoreResult<Vec<Message>> {
        let workspaces = self.workspaces.read().await;
        let state = active(&workspaces, workspace, session)?;

        let mut used: u64 = 0;
        let mut window: Vec<Message> = state
            .messages
            .iter()
            .rev()
            .take_while(|m| {
                used += u64::from(m.token_count);
                used <= u64::from(token_ceiling)
            })
            .cloned()
            .collect();
        window.reverse();
        Ok(window)
    }

    async fn search_messages(
        &self,
        workspace: &str,
        session: &str,
        query: &str,
        semantic: bool,
    ) -> StoreResult<Vec<Message>> {
        if semantic {
            debug!("Semantic search not supported by in-memory store, using keyword match");
        }
        let workspaces = self.workspaces.read().await;
        let state = active(&workspaces, workspace, session)?;
        let needle = query.to_lowercase();

        Ok(state
            .messages
            .iter()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_or_create_session(
        &self,
        workspace: &str,
        name: &str,
        create: SessionCreate,
    ) -> StoreResult<Session> {
        let mut workspaces = self.workspaces.write().await;
        let sessions = &mut workspaces.entry(workspace.to_string()).or_default().sessions;

        let state = sessions.entry(name.to_string()).or_insert_with(|| {
            let mut session = Session::new(workspace, name);
            session.metadata = create.metadata.clone().unwrap_or_default();
            session.configuration = create.configuration.clone().unwrap_or_default();
            debug!(workspace = %workspace, session = %name, "Created session");
            SessionState::new(session)
        });

        if !state.session.is_active {
            return Err(StoreError::InvalidInput(format!("session {name} is inactive")));
        }

        if let Some(peers) = create.peer_names {
            state.peers.extend(peers);
        }
        Ok(state.session.clone())
    }

    async fn list_sessions(
        &self,
        workspace: &str,
        filter: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> StoreResult<Vec<Session>> {
        let workspaces = self.workspaces.read().await;
        let Some(ws) = workspaces.get(workspace) else {
            return Ok(Vec::new());
        };

        let mut sessions: Vec<Session> = ws
            .sessions
            .values()
            .map(|s| &s.session)
            .filter(|s| s.is_active)
            .filter(|s| filter.is_none_or(|f| metadata_matches(&s.metadata, f)))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(sessions)
    }

    async fn update_session(
        &self,
        workspace: &str,
        session: &str,
        update: SessionUpdate,
    ) -> StoreResult<Session> {
        let mut workspaces = self.workspaces.write().await;
        let state = active_mut(&mut workspaces, workspace, session)?;
        if let Some(metadata) = update.metadata {
            state.session.metadata = metadata;
        }
        if let Some(configuration) = update.configuration {
            state.session.configuration = configuration;
        }
        Ok(state.session.clone())
    }

    async fn delete_session(&self, workspace: &str, session: &str) -> StoreResult<()> {
        let mut workspaces = self.workspaces.write().await;
        active_mut(&mut workspaces, workspace, session)?.session.is_active = false;
        Ok(())
    }

    async fn clone_session(
        &self,
        workspace: &str,
        session: &str,
        cutoff_message_id: Option<&str>,
    ) -> StoreResult<Session> {
        let mut workspaces = self.workspaces.write().await;
        let original = active(&workspaces, workspace, session)?;

        let messages: &[Message] = match cutoff_message_id {
            Some(id) => {
                let pos = original
                    .messages
                    .iter()
                    .position(|m| m.id == id)
                    .ok_or_else(|| StoreError::MessageNotFound(id.into()))?;
                &original.messages[..=pos]
            }
            None => &original.messages,
        };

        let name = Uuid::new_v4().simple().to_string();
        let mut cloned = Session::new(workspace, name.clone());
        cloned.metadata = original.session.metadata.clone();
        cloned.configuration = original.session.configuration.clone();

        let mut state = SessionState::new(cloned.clone());
        state.peers = original.peers.clone();
        state.messages = messages
            .iter()
            .map(|m| Message {
                id: Uuid::new_v4().to_string(),
                session_name: name.clone(),
                created_at: Utc::now(),
                ..m.clone()
            })
            .collect();

        if let Some(ws) = workspaces.get_mut(workspace) {
            ws.sessions.insert(name, state);
        }
        Ok(cloned)
    }

    async fn add_peers(
        &self,
        workspace: &str,
        session: &str,
        peers: HashMap<String, SessionPeerConfig>,
    ) -> StoreResult<()> {
        let mut workspaces = self.workspaces.write().await;
        active_mut(&mut workspaces, workspace, session)?
            .peers
            .extend(peers);
        Ok(())
    }

    async fn set_peers(
        &self,
        workspace: &str,
        session: &str,
        peers: HashMap<String, SessionPeerConfig>,
    ) -> StoreResult<()> {
        let mut workspaces = self.workspaces.write().await;
        active_mut(&mut workspaces, workspace, session)?.peers = peers.into_iter().collect();
        Ok(())
    }

    async fn remove_peers(
        &self,
        workspace: &str,
        session: &str,
        peers: &[String],
    ) -> StoreResult<()> {
        let mut workspaces = self.workspaces.write().await;
        let state = active_mut(&mut workspaces, workspace, session)?;
        for peer in peers {
            state.peers.remove(peer);
        }
        Ok(())
    }

    async fn session_peers(&self, workspace: &str, session: &str) -> StoreResult<Vec<String>> {
        let workspaces = self.workspaces.read().await;
        Ok(active(&workspaces, workspace, session)?
            .peers
            .keys()
            .cloned()
            .collect())
    }

    async fn peer_config(
        &self,
        workspace: &str,
        session: &str,
        peer: &str,
    ) -> StoreResult<SessionPeerConfig> {
        let workspaces = self.workspaces.read().await;
        active(&workspaces, workspace, session)?
            .peers
            .get(peer)
            .cloned()
            .ok_or_else(|| StoreError::PeerNotFound(peer.into()))
    }

    async fn set_peer_config(
        &self,
        workspace: &str,
        session: &str,
        peer: &str,
        config: SessionPeerConfig,
    ) -> StoreResult<()> {
        let mut workspaces = self.workspaces.write().await;
        let slot = active_mut(&mut workspaces, workspace, session)?
            .peers
            .get_mut(peer)
            .ok_or_else(|| StoreError::PeerNotFound(peer.into()))?;
        *slot = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::{MessageDraft, TokenCount};

    fn sealed(peer: &str, content: &str, tokens: usize) -> NewMessage {
        MessageDraft::new(peer, content).seal(TokenCount::from_ids(vec![0; tokens]))
    }

    async fn store_with_session() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .get_or_create_session("acme", "s1", SessionCreate::default())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = InMemoryStore::new();
        let first = store
            .get_or_create_session("acme", "s1", SessionCreate::default())
            .await
            .unwrap();
        let second = store
            .get_or_create_session("acme", "s1", SessionCreate::default())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_sessions("acme", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_or_create_adds_peers() {
        let store = store_with_session().await;
        let create = SessionCreate {
            peer_names: Some(HashMap::from([
                ("alice".to_string(), SessionPeerConfig::default()),
                ("bob".to_string(), SessionPeerConfig::default()),
            ])),
            ..SessionCreate::default()
        };
        store.get_or_create_session("acme", "s1", create).await.unwrap();
        assert_eq!(
            store.session_peers("acme", "s1").await.unwrap(),
            vec!["alice", "bob"]
        );
    }

    #[tokio::test]
    async fn recent_window_respects_ceiling() {
        let store = store_with_session().await;
        store
            .create_messages(
                "acme",
                "s1",
                vec![
                    sealed("alice", "one", 40),
                    sealed("bob", "two", 30),
                    sealed("alice", "three", 20),
                    sealed("bob", "four", 10),
                ],
            )
            .await
            .unwrap();

        let window = store.recent_messages("acme", "s1", 65).await.unwrap();
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three", "four"]);

        let all = store.recent_messages("acme", "s1", 100).await.unwrap();
        assert_eq!(all.len(), 4);

        let none = store.recent_messages("acme", "s1", 5).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn recent_window_is_contiguous() {
        let store = store_with_session().await;
        store
            .create_messages(
                "acme",
                "s1",
                vec![sealed("alice", "small", 1), sealed("bob", "huge", 500)],
            )
            .await
            .unwrap();
        let window = store.recent_messages("acme", "s1", 100).await.unwrap();
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = store_with_session().await;
        let err = store.recent_messages("acme", "nope", 10).await.unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
        let err = store.recent_messages("other", "s1", 10).await.unwrap_err();
        assert!(matches!(err, StoreError::WorkspaceNotFound(_)));
    }

    #[tokio::test]
    async fn latest_summary_per_kind() {
        let store = store_with_session().await;
        store
            .save_summary("acme", "s1", SummaryRecord::new(SummaryKind::Short, "old", 3))
            .await
            .unwrap();
        store
            .save_summary("acme", "s1", SummaryRecord::new(SummaryKind::Short, "new", 4))
            .await
            .unwrap();

        let (long, short) = store.latest_summaries("acme", "s1").await.unwrap();
        assert!(long.is_none());
        assert_eq!(short.unwrap().content, "new");
    }

    #[tokio::test]
    async fn deleted_session_disappears() {
        let store = store_with_session().await;
        store.delete_session("acme", "s1").await.unwrap();
        assert!(store.list_sessions("acme", None).await.unwrap().is_empty());
        assert!(matches!(
            store.list_messages("acme", "s1").await,
            Err(StoreError::SessionNotFound(_))
        ));
        assert!(matches!(
            store
                .get_or_create_session("acme", "s1", SessionCreate::default())
                .await,
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_on_metadata() {
        let store = InMemoryStore::new();
        let mut tagged = serde_json::Map::new();
        tagged.insert("team".into(), serde_json::json!("support"));
        store
            .get_or_create_session(
                "acme",
                "s1",
                SessionCreate {
                    metadata: Some(tagged.clone()),
                    ..SessionCreate::default()
                },
            )
            .await
            .unwrap();
        store
            .get_or_create_session("acme", "s2", SessionCreate::default())
            .await
            .unwrap();

        let filtered = store.list_sessions("acme", Some(&tagged)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "s1");
        assert!(store.list_sessions("unknown", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_given_fields_only() {
        let store = store_with_session().await;
        let mut metadata = serde_json::Map::new();
        metadata.insert("k".into(), serde_json::json!(1));
        let updated = store
            .update_session(
                "acme",
                "s1",
                SessionUpdate {
                    metadata: Some(metadata),
                    configuration: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.metadata["k"], 1);
        assert!(updated.configuration.is_empty());
    }

    #[tokio::test]
    async fn clone_stops_at_cutoff() {
        let store = store_with_session().await;
        let created = store
            .create_messages(
                "acme",
                "s1",
                vec![
                    sealed("alice", "a", 1),
                    sealed("bob", "b", 1),
                    sealed("alice", "c", 1),
                ],
            )
            .await
            .unwrap();

        let clone = store
            .clone_session("acme", "s1", Some(&created[1].id))
            .await
            .unwrap();
        let copied = store.list_messages("acme", &clone.name).await.unwrap();
        let contents: Vec<&str> = copied.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
        assert!(copied.iter().all(|m| m.session_name == clone.name));
        assert_ne!(copied[0].id, created[0].id);

        let err = store
            .clone_session("acme", "s1", Some("no-such-message"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MessageNotFound(_)));
    }

    #[tokio::test]
    async fn peer_membership_and_config() {
        let store = store_with_session().await;
        store
            .add_peers(
                "acme",
                "s1",
                HashMap::from([("alice".to_string(), SessionPeerConfig::default())]),
            )
            .await
            .unwrap();

        let config = SessionPeerConfig {
            observe_others: true,
            observe_me: Some(false),
        };
        store
            .set_peer_config("acme", "s1", "alice", config.clone())
            .await
            .unwrap();
        assert_eq!(store.peer_config("acme", "s1", "alice").await.unwrap(), config);

        assert!(matches!(
            store.peer_config("acme", "s1", "carol").await,
            Err(StoreError::PeerNotFound(_))
        ));

        store
            .set_peers(
                "acme",
                "s1",
                HashMap::from([("bob".to_string(), SessionPeerConfig::default())]),
            )
            .await
            .unwrap();
        assert_eq!(store.session_peers("acme", "s1").await.unwrap(), vec!["bob"]);

        store
            .remove_peers("acme", "s1", &["bob".to_string()])
            .await
            .unwrap();
        assert!(store.session_peers("acme", "s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_authors_join_session() {
        let store = store_with_session().await;
        store
            .create_messages("acme", "s1", vec![sealed("dana", "hello", 2)])
            .await
            .unwrap();
        assert_eq!(store.session_peers("acme", "s1").await.unwrap(), vec!["dana"]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let store = store_with_session().await;
        store
            .create_messages(
                "acme",
                "s1",
                vec![
                    sealed("alice", "I love Rust", 3),
                    sealed("bob", "Python is fine", 3),
                ],
            )
            .await
            .unwrap();
        let hits = store.search_messages("acme", "s1", "rust", false).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].peer_name, "alice");
    }
}
