//! Message domain types.
//!
//! Messages are built in two steps: a [`MessageDraft`] arrives from the
//! caller, gets validated, and is sealed with its [`TokenCount`] into a
//! [`NewMessage`]. Storage turns that into a [`Message`] with an id and
//! timestamp. The token count is fixed at sealing time and never recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::validate_resource_name;

/// Upper bound on message content, in characters.
pub const MAX_MESSAGE_CHARS: usize = 50_000;

/// Output of the token counter for a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenCount {
    pub token_ids: Vec<u32>,
    pub token_count: u32,
}

impl TokenCount {
    pub fn from_ids(token_ids: Vec<u32>) -> Self {
        let token_count = u32::try_from(token_ids.len()).unwrap_or(u32::MAX);
        Self {
            token_ids,
            token_count,
        }
    }
}

/// A message as submitted by a caller, before token accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDraft {
    pub content: String,

    /// Peer that authored the message.
    #[serde(rename = "peer_id")]
    pub peer_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl MessageDraft {
    pub fn new(peer_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            peer_name: peer_name.into(),
            metadata: None,
        }
    }

    /// Check content length and the author's name.
    pub fn validate(&self) -> Result<()> {
        let chars = self.content.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(Error::Validation(format!(
                "message content is {chars} characters, limit is {MAX_MESSAGE_CHARS}"
            )));
        }
        validate_resource_name(&self.peer_name)
    }

    /// Attach the token count, producing the immutable value handed to storage.
    pub fn seal(self, count: TokenCount) -> NewMessage {
        NewMessage {
            content: self.content,
            peer_name: self.peer_name,
            metadata: self.metadata.unwrap_or_default(),
            token_ids: count.token_ids,
            token_count: count.token_count,
        }
    }
}

/// A validated, token-counted message ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    content: String,
    peer_name: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    token_ids: Vec<u32>,
    token_count: u32,
}

impl NewMessage {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    pub fn token_ids(&self) -> &[u32] {
        &self.token_ids
    }

    pub fn token_count(&self) -> u32 {
        self.token_count
    }

    /// Assign identity within a session. The token ids are dropped here;
    /// only the count is persisted.
    pub fn into_message(self, workspace: &str, session: &str) -> Message {
        Message {
            id: Uuid::new_v4().to_string(),
            content: self.content,
            peer_name: self.peer_name,
            session_name: session.to_string(),
            metadata: self.metadata,
            created_at: Utc::now(),
            workspace_name: workspace.to_string(),
            token_count: self.token_count,
        }
    }
}

/// A stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    pub content: String,

    #[serde(rename = "peer_id")]
    pub peer_name: String,

    #[serde(rename = "session_id")]
    pub session_name: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,

    #[serde(rename = "workspace_id")]
    pub workspace_name: String,

    pub token_count: u32,
}
