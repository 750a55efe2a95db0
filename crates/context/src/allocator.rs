//! Token budget allocation and summary selection.
//!
//! Splits a caller's token limit between one session summary and the
//! verbatim message window. At most 40% of the limit may go to the summary;
//! whatever the chosen summary does not use flows to messages.
//!
//! # Selection table
//!
//! Only summaries that fit the summary budget are candidates. The first row
//! whose condition holds wins:
//!
//! | Row | Pick  | Condition |
//! |-----|-------|-----------|
//! | 1   | long  | longer than the short candidate (0 if none) |
//! | 2   | short | non-empty |
//! | 3   | none  | always |
//!
//! The short summary can occasionally outgrow the long one, which row 1
//! accounts for by comparing lengths instead of preferring long blindly.

use colloquy_core::{SummaryKind, SummaryRecord};
use tracing::warn;

/// Inputs to [`allocate`] besides the summaries themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Total budget for summary plus messages. Must be positive.
    pub token_limit: u32,
    pub include_summary: bool,
    /// Reserved: on-the-fly exhaustive summaries are not available. Only
    /// produces a diagnostic.
    pub force_new: bool,
}

/// How the budget was split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Content of the chosen summary, empty when none was chosen.
    pub summary_content: String,
    /// Ceiling handed to the message store.
    pub message_token_budget: u32,
    pub chosen: Option<SummaryKind>,
}

/// The summary ceiling: `floor(token_limit * 0.4)`, in exact integer arithmetic.
pub fn summary_budget(token_limit: u32) -> u32 {
    // Fits in u32 again since the result is below the input.
    (u64::from(token_limit) * 2 / 5) as u32
}

/// Extra condition a fitting candidate must meet to be chosen.
#[derive(Debug, Clone, Copy)]
enum Condition {
    LongerThanShort,
    NonEmpty,
}

const SELECTION: [(SummaryKind, Condition); 2] = [
    (SummaryKind::Long, Condition::LongerThanShort),
    (SummaryKind::Short, Condition::NonEmpty),
];

/// The summaries that fit the budget, keyed by kind.
struct Candidates<'a> {
    long: Option<&'a SummaryRecord>,
    short: Option<&'a SummaryRecord>,
}

impl<'a> Candidates<'a> {
    fn get(&self, kind: SummaryKind) -> Option<&'a SummaryRecord> {
        match kind {
            SummaryKind::Long => self.long,
            SummaryKind::Short => self.short,
        }
    }

    fn holds(&self, record: &SummaryRecord, condition: Condition) -> bool {
        match condition {
            Condition::LongerThanShort => {
                record.token_count > self.short.map_or(0, |s| s.token_count)
            }
            Condition::NonEmpty => record.token_count > 0,
        }
    }

    fn select(&self) -> Option<&'a SummaryRecord> {
        SELECTION.iter().find_map(|&(kind, condition)| {
            self.get(kind).filter(|record| self.holds(record, condition))
        })
    }
}

/// Split `request.token_limit` between a summary and the message window.
///
/// Total: never fails. Missing, empty, or oversized summaries leave the whole
/// budget to messages.
pub fn allocate(
    request: AllocationRequest,
    long: Option<&SummaryRecord>,
    short: Option<&SummaryRecord>,
) -> Allocation {
    let token_limit = request.token_limit;

    if !request.include_summary {
        return Allocation {
            summary_content: String::new(),
            message_token_budget: token_limit,
            chosen: None,
        };
    }

    if request.force_new {
        warn!("Exhaustive summary requested -- not currently available");
    }

    let budget = summary_budget(token_limit);
    let fits = |record: &&SummaryRecord| record.token_count <= budget;
    let candidates = Candidates {
        long: long.filter(fits),
        short: short.filter(fits),
    };

    match candidates.select() {
        Some(record) => Allocation {
            summary_content: record.content.clone(),
            message_token_budget: token_limit - record.token_count,
            chosen: Some(record.kind),
        },
        None => {
            warn!(
                long_summary_len = long.map_or(0, |s| s.token_count),
                short_summary_len = short.map_or(0, |s| s.token_count),
                summary_budget = budget,
                "No summary available for context, returning empty string"
            );
            Allocation {
                summary_content: String::new(),
                message_token_budget: token_limit,
                chosen: None,
            }
        }
    }
}
