//! Capability token: what a caller is allowed to touch.
//!
//! Produced by the authentication layer from a signed credential and
//! consumed by the scope guard. A `None` scope means the token places no
//! restriction at that level.

use serde::{Deserialize, Serialize};

/// Decoded capability carried by a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityToken {
    /// Admin tokens bypass every scope check.
    #[serde(default)]
    pub admin: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_scope: Option<String>,
}

impl CapabilityToken {
    /// An unrestricted admin capability.
    pub fn admin() -> Self {
        Self {
            admin: true,
            ..Self::default()
        }
    }

    /// A capability limited to one workspace.
    pub fn workspace(workspace: impl Into<String>) -> Self {
        Self {
            workspace_scope: Some(workspace.into()),
            ..Self::default()
        }
    }

    /// Narrow this capability to a single session.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session_scope = Some(session.into());
        self
    }

    /// Narrow this capability to a single peer.
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer_scope = Some(peer.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose_scopes() {
        let token = CapabilityToken::workspace("acme").with_session("s1").with_peer("alice");
        assert!(!token.admin);
        assert_eq!(token.workspace_scope.as_deref(), Some("acme"));
        assert_eq!(token.session_scope.as_deref(), Some("s1"));
        assert_eq!(token.peer_scope.as_deref(), Some("alice"));
    }

    #[test]
    fn unset_scopes_are_omitted_from_json() {
        let json = serde_json::to_string(&CapabilityToken::admin()).unwrap();
        assert_eq!(json, r#"{"admin":true}"#);
    }
}
