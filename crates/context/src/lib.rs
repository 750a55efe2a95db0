//! Session context assembly for Colloquy.
//!
//! Builds the payload a caller feeds to a model: the best-fitting session
//! summary plus as many recent messages as the remaining budget allows.
//!
//! | Step | Component | Pure |
//! |------|-----------|------|
//! | 1. Count | [`token`]: cl100k_base token counts, fixed at message creation | yes |
//! | 2. Allocate | [`allocator`]: 40% summary ceiling, long/short tie-break | yes |
//! | 3. Assemble | [`assembler`]: fetch summaries, allocate, fetch message window | no |

pub mod allocator;
pub mod assembler;
pub mod token;

pub use allocator::{Allocation, AllocationRequest, allocate, summary_budget};
pub use assembler::{ContextAssembler, ContextOptions, ContextPayload, DEFAULT_TOKEN_LIMIT};
