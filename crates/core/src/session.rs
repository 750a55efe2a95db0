//! Session domain types and resource-name validation.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Maximum length of a workspace, session, or peer name.
pub const MAX_RESOURCE_NAME_LEN: usize = 100;

static RESOURCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("resource name pattern is valid"));

/// Check a workspace/session/peer name: 1–100 chars of `[a-zA-Z0-9_-]`.
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_RESOURCE_NAME_LEN {
        return Err(Error::Validation(format!(
            "name must be 1-{MAX_RESOURCE_NAME_LEN} characters, got {}",
            name.len()
        )));
    }
    if !RESOURCE_NAME.is_match(name) {
        return Err(Error::Validation(format!(
            "name '{name}' may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

/// Per-peer observation settings within one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPeerConfig {
    /// Whether this peer forms a session-level view of the other peers.
    #[serde(default)]
    pub observe_others: bool,

    /// Whether other peers may form a session-level view of this peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observe_me: Option<bool>,
}

/// A conversation session inside a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "id")]
    pub name: String,

    pub is_active: bool,

    #[serde(rename = "workspace_id")]
    pub workspace_name: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub configuration: serde_json::Map<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            workspace_name: workspace.into(),
            metadata: serde_json::Map::new(),
            configuration: serde_json::Map::new(),
            created_at: Utc::now(),
        }
    }
}

/// Body of a get-or-create request. The name may be omitted when the
/// caller's capability is scoped to a single session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCreate {
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(default, rename = "peers", skip_serializing_if = "Option::is_none")]
    pub peer_names: Option<HashMap<String, SessionPeerConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Partial update of a session. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(default)]
    pub configuration: Option<serde_json::Map<String, serde_json::Value>>,
}
