//! Insight extraction
//!
//! Pulls named fields out of free-form stage responses and synthesizes the
//! table rows the document template needs.
//!
//! ## Features
//!
//! - **Sections**: ordered fallback chain of keyword strategies
//! - **Insights**: the fixed key set, always fully populated
//! - **Tables**: requirements, personas, stakeholders and prioritization rows
//!
//! Extraction is heuristic. Callers may rely on the fallback guarantees
//! (every key present, every table at least one row), not on the content.

mod insights;
mod sections;
mod tables;

pub use insights::{InsightBundle, InsightKey, extract_insights};
pub use sections::{SUMMARY_PENDING, create_summary, extract_section};
pub use tables::{
    Persona, extract_personas, personas_table, prioritization_table, requirements_table,
    stakeholder_table,
};
