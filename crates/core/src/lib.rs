//! # Colloquy Core
//!
//! Domain types, store traits, and error definitions for the Colloquy
//! session-context service. This crate has **no framework dependencies**:
//! it defines the model that the guard, the context assembler, the store
//! backends, and the HTTP gateway all build against.
//!
//! ## Design Philosophy
//!
//! Storage is a collaborator, not part of the core. Every store is a trait
//! here and implementations live in their own crates, which keeps the
//! request-time decision logic testable against in-process backends.

pub mod capability;
pub mod error;
pub mod message;
pub mod session;
pub mod store;
pub mod summary;

// Re-export key types at crate root for ergonomics
pub use capability::CapabilityToken;
pub use error::{Error, Result, StoreError};
pub use message::{Message, MessageDraft, NewMessage, TokenCount};
pub use session::{Session, SessionCreate, SessionPeerConfig, SessionUpdate, validate_resource_name};
pub use store::{MessageStore, SessionStore, SummaryStore};
pub use summary::{SummaryKind, SummaryRecord};
