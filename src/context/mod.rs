//! Context budgeting
//!
//! This module keeps every stage prompt within the completion service's
//! request ceiling.
//!
//! ## Features
//!
//! - **Summarizer**: compress one stage response into a salient-line digest
//! - **Budgeter**: assemble the digests of relevant earlier stages under a word budget
//! - **Truncator**: soft and hard whole-prompt truncation that keeps the product idea
//!
//! ## Usage
//!
//! ```ignore
//! use prd_forge::context::{ContextBudgeter, soft_truncate};
//!
//! let budgeter = ContextBudgeter::new(1500, 300);
//! let digest = budgeter.build(&responses, Stage::Cut);
//! let prompt = soft_truncate(&prompt, 4000);
//! ```

mod budgeter;
mod summarizer;
mod truncator;

pub use budgeter::{CONTEXT_ELISION_MARKER, CONTEXT_HEADER, ContextBudgeter};
pub(crate) use summarizer::is_list_item;
pub use summarizer::{KEY_FINDINGS_MARKER, summarize_response};
pub use truncator::{
    CLOSING_INSTRUCTION_MARKER, CONTINUATION_INSTRUCTION, PRODUCT_IDEA_PREFIX, TRUNCATION_SUFFIX,
    hard_truncate, soft_truncate,
};
