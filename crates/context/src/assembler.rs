//! Context assembly: the read path behind `GET .../context`.
//!
//! 1. **Summaries**: latest long and short, fetched concurrently
//! 2. **Allocation**: pure budget split and summary choice ([`allocate`])
//! 3. **Messages**: recent window from the message store, bounded by the
//!    allocation's message budget
//!
//! The caller must have passed the scope guard already. Assembly performs no
//! writes; messages or summaries landing between steps are tolerated.

use crate::allocator::{AllocationRequest, allocate};
use colloquy_core::{Message, MessageStore, Result, SummaryStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Token limit applied when neither the caller nor configuration names one.
pub const DEFAULT_TOKEN_LIMIT: u32 = 2048;

/// Per-request knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// `None` (or zero) falls back to the assembler's default limit.
    pub token_limit: Option<u32>,
    pub include_summary: bool,
    pub force_new: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            token_limit: None,
            include_summary: true,
            force_new: false,
        }
    }
}

/// The assembled context for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
    #[serde(rename = "id")]
    pub name: String,
    /// In the order the message store returned them.
    pub messages: Vec<Message>,
    pub summary: String,
}

/// The context assembler. Holds no per-request state; share one instance.
pub struct ContextAssembler {
    summaries: Arc<dyn SummaryStore>,
    messages: Arc<dyn MessageStore>,
    default_token_limit: u32,
}

impl ContextAssembler {
    pub fn new(summaries: Arc<dyn SummaryStore>, messages: Arc<dyn MessageStore>) -> Self {
        Self {
            summaries,
            messages,
            default_token_limit: DEFAULT_TOKEN_LIMIT,
        }
    }

    /// Override the process-wide default limit. Zero keeps the built-in default.
    pub fn with_default_token_limit(mut self, limit: u32) -> Self {
        if limit > 0 {
            self.default_token_limit = limit;
        }
        self
    }

    pub fn default_token_limit(&self) -> u32 {
        self.default_token_limit
    }

    /// Build the context payload for `session`.
    pub async fn assemble(
        &self,
        workspace: &str,
        session: &str,
        options: ContextOptions,
    ) -> Result<ContextPayload> {
        let token_limit = options
            .token_limit
            .filter(|&limit| limit > 0)
            .unwrap_or(self.default_token_limit);

        let (long, short) = if options.include_summary {
            self.summaries.latest_summaries(workspace, session).await?
        } else {
            (None, None)
        };

        let allocation = allocate(
            AllocationRequest {
                token_limit,
                include_summary: options.include_summary,
                force_new: options.force_new,
            },
            long.as_ref(),
            short.as_ref(),
        );

        let messages = self
            .messages
            .recent_messages(workspace, session, allocation.message_token_budget)
            .await?;

        info!(
            workspace = %workspace,
            session = %session,
            token_limit,
            summary = ?allocation.chosen,
            message_budget = allocation.message_token_budget,
            "Retrieved {} recent messages for verbatim return",
            messages.len()
        );

        Ok(ContextPayload {
            name: session.to_string(),
            messages,
            summary: allocation.summary_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_core::{
        Error, MessageDraft, NewMessage, StoreError, SummaryKind, SummaryRecord, TokenCount,
    };
    use std::sync::Mutex;

    // ── Stub stores ────────────────────────────────────────────────────

    struct FixedSummaries {
        long: Option<SummaryRecord>,
        short: Option<SummaryRecord>,
        calls: Mutex<usize>,
    }

    impl FixedSummaries {
        fn new(long: Option<u32>, short: Option<u32>) -> Self {
            Self {
                long: long.map(|t| SummaryRecord::new(SummaryKind::Long, "long summary", t)),
                short: short.map(|t| SummaryRecord::new(SummaryKind::Short, "short summary", t)),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SummaryStore for FixedSummaries {
        async fn latest_summary(
            &self,
            _workspace: &str,
            session: &str,
            kind: SummaryKind,
        ) -> std::result::Result<Option<SummaryRecord>, StoreError> {
            *self.calls.lock().unwrap() += 1;
            if session == "missing" {
                return Err(StoreError::SessionNotFound(session.into()));
            }
            Ok(match kind {
                SummaryKind::Long => self.long.clone(),
                SummaryKind::Short => self.short.clone(),
            })
        }

        async fn save_summary(
            &self,
            _workspace: &str,
            _session: &str,
            _summary: SummaryRecord,
        ) -> std::result::Result<(), StoreError> {
            unreachable!("assembly never writes summaries")
        }
    }

    /// Returns a fixed message list and records the ceilings it was asked for.
    struct RecordingMessages {
        messages: Vec<Message>,
        ceilings: Mutex<Vec<u32>>,
    }

    impl RecordingMessages {
        fn new(contents: &[&str]) -> Self {
            let messages = contents
                .iter()
                .map(|c| {
                    MessageDraft::new("alice", *c)
                        .seal(TokenCount::from_ids(vec![0; 10]))
                        .into_message("acme", "s1")
                })
                .collect();
            Self {
                messages,
                ceilings: Mutex::new(Vec::new()),
            }
        }

        fn ceilings(&self) -> Vec<u32> {
            self.ceilings.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageStore for RecordingMessages {
        async fn create_messages(
            &self,
            _workspace: &str,
            _session: &str,
            _messages: Vec<NewMessage>,
        ) -> std::result::Result<Vec<Message>, StoreError> {
            unreachable!("assembly never writes messages")
        }

        async fn list_messages(
            &self,
            _workspace: &str,
            _session: &str,
        ) -> std::result::Result<Vec<Message>, StoreError> {
            Ok(self.messages.clone())
        }

        async fn recent_messages(
            &self,
            _workspace: &str,
            _session: &str,
            token_ceiling: u32,
        ) -> std::result::Result<Vec<Message>, StoreError> {
            self.ceilings.lock().unwrap().push(token_ceiling);
            Ok(self.messages.clone())
        }

        async fn search_messages(
            &self,
            _workspace: &str,
            _session: &str,
            _query: &str,
            _semantic: bool,
        ) -> std::result::Result<Vec<Message>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn assembler(
        summaries: &Arc<FixedSummaries>,
        messages: &Arc<RecordingMessages>,
    ) -> ContextAssembler {
        ContextAssembler::new(summaries.clone(), messages.clone())
    }

    // ── Tests ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn chosen_summary_shrinks_message_ceiling() {
        let summaries = Arc::new(FixedSummaries::new(Some(500), Some(700)));
        let messages = Arc::new(RecordingMessages::new(&["hi", "there"]));

        let payload = assembler(&summaries, &messages)
            .assemble("acme", "s1", ContextOptions::default())
            .await
            .unwrap();

        assert_eq!(payload.name, "s1");
        assert_eq!(payload.summary, "short summary");
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(messages.ceilings(), vec![1348]);
    }

    #[tokio::test]
    async fn explicit_limit_overrides_default() {
        let summaries = Arc::new(FixedSummaries::new(Some(100), Some(150)));
        let messages = Arc::new(RecordingMessages::new(&[]));

        let options = ContextOptions {
            token_limit: Some(300),
            ..ContextOptions::default()
        };
        let payload = assembler(&summaries, &messages)
            .assemble("acme", "s1", options)
            .await
            .unwrap();

        assert_eq!(payload.summary, "long summary");
        assert_eq!(messages.ceilings(), vec![200]);
    }

    #[tokio::test]
    async fn zero_limit_uses_default() {
        let summaries = Arc::new(FixedSummaries::new(None, None));
        let messages = Arc::new(RecordingMessages::new(&[]));

        let options = ContextOptions {
            token_limit: Some(0),
            ..ContextOptions::default()
        };
        assembler(&summaries, &messages)
            .with_default_token_limit(4096)
            .assemble("acme", "s1", options)
            .await
            .unwrap();

        assert_eq!(messages.ceilings(), vec![4096]);
    }

    #[tokio::test]
    async fn summary_disabled_skips_summary_fetch() {
        let summaries = Arc::new(FixedSummaries::new(Some(10), Some(5)));
        let messages = Arc::new(RecordingMessages::new(&["only messages"]));

        let options = ContextOptions {
            include_summary: false,
            ..ContextOptions::default()
        };
        let payload = assembler(&summaries, &messages)
            .assemble("acme", "s1", options)
            .await
            .unwrap();

        assert_eq!(payload.summary, "");
        assert_eq!(summaries.calls(), 0);
        assert_eq!(messages.ceilings(), vec![DEFAULT_TOKEN_LIMIT]);
    }

    #[tokio::test]
    async fn no_summaries_gives_full_budget_to_messages() {
        let summaries = Arc::new(FixedSummaries::new(None, None));
        let messages = Arc::new(RecordingMessages::new(&["a"]));

        let payload = assembler(&summaries, &messages)
            .assemble("acme", "s1", ContextOptions::default())
            .await
            .unwrap();

        assert_eq!(payload.summary, "");
        assert_eq!(summaries.calls(), 2);
        assert_eq!(messages.ceilings(), vec![2048]);
    }

    #[tokio::test]
    async fn unknown_session_surfaces_not_found() {
        let summaries = Arc::new(FixedSummaries::new(None, None));
        let messages = Arc::new(RecordingMessages::new(&[]));

        let err = assembler(&summaries, &messages)
            .assemble("acme", "missing", ContextOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(messages.ceilings().is_empty());
    }

    #[test]
    fn payload_serializes_session_as_id() {
        let payload = ContextPayload {
            name: "s1".into(),
            messages: vec![],
            summary: "sum".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["id"], "s1");
        assert_eq!(json["summary"], "sum");
        assert!(json["messages"].as_array().unwrap().is_empty());
    }
}
