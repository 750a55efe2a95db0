//! Capability scope guard: decides whether a token reaches a resource.
//!
//! Pure and synchronous. Handlers call [`authorize`] before touching any
//! store and turn a [`ScopeDecision::Deny`] into an authorization error.

use colloquy_core::{CapabilityToken, Error};

/// The scope an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRequest<'a> {
    /// Workspace plus, optionally, a session named in the path.
    Explicit {
        workspace: &'a str,
        session: Option<&'a str>,
    },
    /// Session may come from the request body or be implied by the token.
    GetOrCreate {
        workspace: &'a str,
        session: Option<&'a str>,
    },
    /// Workspace plus a peer named in the path.
    Peer { workspace: &'a str, peer: &'a str },
}

impl ScopeRequest<'_> {
    fn workspace(&self) -> &str {
        match self {
            Self::Explicit { workspace, .. }
            | Self::GetOrCreate { workspace, .. }
            | Self::Peer { workspace, .. } => workspace,
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Workspace,
    Session,
    Peer,
    SessionMissing,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "unauthorized workspace",
            Self::Session => "unauthorized session",
            Self::Peer => "unauthorized peer",
            Self::SessionMissing => "session id not found in query or token",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating a token against a [`ScopeRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeDecision {
    /// Access granted. `session` is the effective session name: the one the
    /// request named, or for get-or-create the one the token implies.
    Allow { session: Option<String> },
    Deny { reason: DenyReason },
}

impl ScopeDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Convert into the crate-wide error taxonomy, yielding the effective session.
    pub fn into_result(self) -> Result<Option<String>, Error> {
        match self {
            Self::Allow { session } => Ok(session),
            Self::Deny { reason } => Err(Error::Authorization(reason.to_string())),
        }
    }
}

/// Evaluate `token` against `request`.
///
/// Rules, in order:
/// 1. Admin tokens are allowed without further checks.
/// 2. A workspace scope that differs from the requested workspace is denied.
/// 3. Session rules depend on the request shape:
///    - explicit: a session scope that differs from the path session is denied;
///    - get-or-create: with no session named, the token's session scope is
///      required and adopted; with one named, a differing scope is denied.
/// 4. A peer scope that differs from the path peer is denied.
/// 5. Everything else is allowed.
pub fn authorize(token: &CapabilityToken, request: ScopeRequest<'_>) -> ScopeDecision {
    if token.admin {
        let session = match request {
            ScopeRequest::Explicit { session, .. } => session.map(str::to_string),
            ScopeRequest::GetOrCreate { session, .. } => session
                .map(str::to_string)
                .or_else(|| token.session_scope.clone()),
            ScopeRequest::Peer { .. } => None,
        };
        return ScopeDecision::Allow { session };
    }

    if token
        .workspace_scope
        .as_deref()
        .is_some_and(|scope| scope != request.workspace())
    {
        return deny(DenyReason::Workspace);
    }

    match request {
        ScopeRequest::Explicit { session, .. } => {
            if let (Some(scope), Some(requested)) = (token.session_scope.as_deref(), session) {
                if scope != requested {
                    return deny(DenyReason::Session);
                }
            }
            ScopeDecision::Allow {
                session: session.map(str::to_string),
            }
        }
        ScopeRequest::GetOrCreate { session, .. } => match (session, token.session_scope.as_deref()) {
            (None, None) => deny(DenyReason::SessionMissing),
            (None, Some(scope)) => ScopeDecision::Allow {
                session: Some(scope.to_string()),
            },
            (Some(requested), Some(scope)) if scope != requested => deny(DenyReason::Session),
            (Some(requested), _) => ScopeDecision::Allow {
                session: Some(requested.to_string()),
            },
        },
        ScopeRequest::Peer { peer, .. } => {
            if token.peer_scope.as_deref().is_some_and(|scope| scope != peer) {
                return deny(DenyReason::Peer);
            }
            ScopeDecision::Allow { session: None }
        }
    }
}

fn deny(reason: DenyReason) -> ScopeDecision {
    ScopeDecision::Deny { reason }
}
