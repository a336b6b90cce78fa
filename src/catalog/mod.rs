//! Prompt and template catalogs consumed by the pipeline.

pub mod prompts;
pub mod templates;

pub use prompts::{
    DOCUMENT_TEMPLATE_PROMPT, DirectoryCatalog, EmbeddedCatalog, LayeredCatalog, PromptCatalog,
};
pub use templates::{DEFAULT_TEMPLATE_ID, Question, Template, TemplateCatalog};
