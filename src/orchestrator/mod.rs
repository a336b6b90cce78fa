//! Stage orchestration.
//!
//! Strictly sequential: stage *n* starts only after stage *n - 1* has recorded
//! a response or a failure marker. The only suspension points are the
//! completion call and the rate-limit backoff inside it.

pub mod prompt;
pub mod runner;

pub use prompt::{
    CONTEXT_VALUE_MAX_CHARS, ConversationContext, FORMATTING_GUIDANCE, base_context,
    compose_stage_prompt,
};
pub use runner::StageRunner;
