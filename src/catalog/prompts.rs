//! Prompt catalog.
//!
//! Stage instructions and the document template ship inside the binary
//! (`prompts/` is embedded at compile time). A prompts directory configured at
//! runtime overrides individual files by name.

use std::path::{Path, PathBuf};

use rust_embed::RustEmbed;
use tracing::debug;

use crate::errors::CatalogError;

/// Name of the document template prompt.
pub const DOCUMENT_TEMPLATE_PROMPT: &str = "prd_template.prompt";

/// Source of named prompt texts.
pub trait PromptCatalog: Send + Sync {
    /// Load the prompt called `name` (file name including extension).
    fn load_prompt(&self, name: &str) -> Result<String, CatalogError>;
}

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/prompts/"]
struct EmbeddedPrompts;

/// Prompts compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCatalog;

impl EmbeddedCatalog {
    /// Names of every embedded prompt, sorted.
    #[cfg(test)]
    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = EmbeddedPrompts::iter().map(|name| name.into_owned()).collect();
        names.sort();
        names
    }
}

impl PromptCatalog for EmbeddedCatalog {
    fn load_prompt(&self, name: &str) -> Result<String, CatalogError> {
        let file = EmbeddedPrompts::get(name).ok_or_else(|| CatalogError::PromptNotFound {
            name: name.to_string(),
        })?;
        Ok(String::from_utf8_lossy(&file.data).into_owned())
    }
}

/// Prompts read from a directory on every lookup.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PromptCatalog for DirectoryCatalog {
    fn load_prompt(&self, name: &str) -> Result<String, CatalogError> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(CatalogError::PromptNotFound {
                name: name.to_string(),
            });
        }
        std::fs::read_to_string(&path).map_err(|source| CatalogError::ReadFailed { path, source })
    }
}

/// Directory overrides in front of the embedded prompts.
#[derive(Debug, Clone, Default)]
pub struct LayeredCatalog {
    overrides: Option<DirectoryCatalog>,
    embedded: EmbeddedCatalog,
}

impl LayeredCatalog {
    pub fn new(prompts_dir: Option<PathBuf>) -> Self {
        Self {
            overrides: prompts_dir.map(DirectoryCatalog::new),
            embedded: EmbeddedCatalog,
        }
    }
}

impl PromptCatalog for LayeredCatalog {
    fn load_prompt(&self, name: &str) -> Result<String, CatalogError> {
        if let Some(dir) = &self.overrides {
            match dir.load_prompt(name) {
                Ok(text) => {
                    debug!(name, dir = %dir.dir().display(), "Loaded prompt override");
                    return Ok(text);
                }
                Err(CatalogError::PromptNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        self.embedded.load_prompt(name)
    }
}
