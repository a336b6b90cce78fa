//! Product requirements generation driven by the CIRCLES framework.
//!
//! A product idea is run through seven analysis stages against a chat
//! completion service. Stage outputs are condensed between calls to stay
//! inside the request budget, then assembled into a markdown document and
//! scored for framework coverage.

pub mod agent;
pub mod assemble;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod context;
pub mod coverage;
pub mod errors;
pub mod evaluate;
pub mod extract;
pub mod orchestrator;
pub mod session;
pub mod stage;
pub mod tokens;

pub use agent::{GenerationRequest, GenerationResult, PrdAgent};
pub use config::PrdConfig;
pub use errors::AgentError;
pub use stage::Stage;
