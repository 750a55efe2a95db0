//! Security module for Colloquy: capability tokens and scope checks.
//!
//! Provides:
//! - **Capabilities**: Verify and issue signed capability tokens
//! - **Scope guard**: Decide whether a capability reaches a workspace, session, or peer

pub mod capability;
pub mod guard;

pub use capability::{CapabilityClaims, CapabilityError, CapabilityVerifier, bearer_token};
pub use guard::{DenyReason, ScopeDecision, ScopeRequest, authorize};
