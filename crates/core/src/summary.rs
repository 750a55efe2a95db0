//! Session summaries produced by the external derivation job.
//!
//! Two variants are maintained per session. The core only ever sees the
//! latest record of each kind and never writes them itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which summary variant a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Long,
    Short,
}

impl std::fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => f.write_str("long"),
            Self::Short => f.write_str("short"),
        }
    }
}

/// An immutable summary of a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub content: String,
    pub token_count: u32,
    pub kind: SummaryKind,
    pub created_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn new(kind: SummaryKind, content: impl Into<String>, token_count: u32) -> Self {
        Self {
            content: content.into(),
            token_count,
            kind,
            created_at: Utc::now(),
        }
    }
}
