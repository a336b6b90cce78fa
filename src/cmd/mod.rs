//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled          |
//! |-------------|---------------------------|
//! | `generate`  | `Generate`                |
//! | `catalog`   | `Templates`, `Questions`  |

pub mod catalog;
pub mod generate;

pub use catalog::{cmd_questions, cmd_templates};
pub use generate::{GenerateOptions, cmd_generate, parse_context_pair};
