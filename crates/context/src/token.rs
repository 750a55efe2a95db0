//! Token counting.
//!
//! Uses the `cl100k_base` BPE encoding. Counts are taken once, when a
//! message is sealed, and stored with it; budget arithmetic elsewhere only
//! ever reads the stored counts.

use colloquy_core::{MessageDraft, NewMessage, Result, TokenCount};
use std::sync::LazyLock;
use tiktoken_rs::CoreBPE;

/// Name of the encoding every stored token count was produced with.
pub const ENCODING: &str = "cl100k_base";

static BPE: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("embedded cl100k_base table loads"));

/// Tokenize `text`.
///
/// Special-token markers such as `<|endoftext|>` are encoded as ordinary
/// text, so every input has a count.
pub fn count(text: &str) -> TokenCount {
    if text.is_empty() {
        return TokenCount::default();
    }
    TokenCount::from_ids(BPE.encode_ordinary(text))
}

/// Token count of `text`, without the ids.
pub fn count_tokens(text: &str) -> u32 {
    count(text).token_count
}

/// Validate a draft and seal it with its token count.
pub fn seal(draft: MessageDraft) -> Result<NewMessage> {
    draft.validate()?;
    let counted = count(&draft.content);
    Ok(draft.seal(counted))
}
