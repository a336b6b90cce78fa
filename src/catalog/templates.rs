//! Template and question catalog.
//!
//! Three templates are built in. A templates directory adds (or replaces) them
//! with one `<id>.json` file per template; files whose stem ends in `_config`
//! are configuration, not templates, and are skipped.

use std::collections::BTreeMap;
use std::path::Path;

use glob::glob;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::CatalogError;

/// Template used when the caller does not choose one.
pub const DEFAULT_TEMPLATE_ID: &str = "standard_template";

/// Questions always returned when padding a short set.
const MIN_QUESTIONS: usize = 8;
const MAX_QUESTIONS: usize = 12;

/// Document template metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sections: Vec<String>,
}

impl Template {
    fn new(name: &str, description: &str, category: &str, sections: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            sections: sections.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// An interview question derived from a template section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    pub category: String,
    pub required: bool,
}

impl Question {
    fn new(id: &str, question: &str, category: &str, required: bool) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            category: category.to_string(),
            required,
        }
    }
}

fn builtin_templates() -> BTreeMap<String, Template> {
    BTreeMap::from([
        (
            "standard_template".to_string(),
            Template::new(
                "Standard BRD Template",
                "Comprehensive business requirements document template suitable for most projects",
                "general",
                &[
                    "executive_summary",
                    "problem_statement",
                    "solution_overview",
                    "requirements",
                    "success_criteria",
                    "implementation_plan",
                ],
            ),
        ),
        (
            "agile_feature_template".to_string(),
            Template::new(
                "Agile Feature Template",
                "Template optimized for agile development and feature specifications",
                "agile",
                &[
                    "feature_overview",
                    "user_stories",
                    "acceptance_criteria",
                    "technical_requirements",
                    "testing_criteria",
                ],
            ),
        ),
        (
            "mobile_app_template".to_string(),
            Template::new(
                "Mobile App Template",
                "Specialized template for mobile application requirements",
                "mobile",
                &[
                    "app_overview",
                    "user_experience",
                    "functional_requirements",
                    "platform_requirements",
                    "performance_criteria",
                    "security_requirements",
                ],
            ),
        ),
    ])
}

fn section_questions(section: &str) -> Vec<Question> {
    match section {
        "executive_summary" => vec![
            Question::new(
                "problem_statement",
                "What is the main problem or challenge you're trying to solve?",
                "problem_analysis",
                true,
            ),
            Question::new(
                "solution_overview",
                "What is your proposed solution in a nutshell?",
                "solution_design",
                true,
            ),
        ],
        "business_case" => vec![Question::new(
            "business_value",
            "What business value will this solution provide?",
            "business_analysis",
            true,
        )],
        "stakeholder_analysis" => vec![Question::new(
            "target_users",
            "Who are your target users or customers?",
            "user_analysis",
            true,
        )],
        "requirements_specification" => vec![Question::new(
            "functional_requirements",
            "What are the key functional requirements?",
            "requirements",
            true,
        )],
        "success_criteria" => vec![Question::new(
            "success_metrics",
            "How will you measure success?",
            "metrics",
            true,
        )],
        "implementation_plan" => vec![Question::new(
            "timeline",
            "What is your expected timeline?",
            "planning",
            false,
        )],
        _ => Vec::new(),
    }
}

fn default_questions() -> Vec<Question> {
    vec![
        Question::new("product_overview", "What is your product or project about?", "overview", true),
        Question::new("target_audience", "Who is your target audience?", "users", true),
        Question::new("main_problem", "What main problem does this solve?", "problem", true),
        Question::new("key_features", "What are the key features or capabilities?", "features", true),
        Question::new(
            "success_definition",
            "How do you define success for this project?",
            "success",
            true,
        ),
    ]
}

fn additional_questions() -> Vec<Question> {
    vec![
        Question::new(
            "technical_constraints",
            "Are there any technical constraints or requirements?",
            "technical",
            false,
        ),
        Question::new(
            "budget_timeline",
            "What are your budget and timeline constraints?",
            "constraints",
            false,
        ),
        Question::new("competition", "What alternatives or competitors exist?", "competitive", false),
        Question::new("risks", "What are the main risks or challenges?", "risks", false),
        Question::new("stakeholders", "Who are the key stakeholders?", "stakeholders", false),
        Question::new("assumptions", "What key assumptions are you making?", "assumptions", false),
        Question::new("integration", "What systems or tools need to integrate?", "integration", false),
    ]
}

/// All known templates, keyed by id.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Template>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateCatalog {
    /// The built-in templates only.
    pub fn builtin() -> Self {
        Self {
            templates: builtin_templates(),
        }
    }

    /// Built-in templates plus every `*.json` template in `dir`.
    ///
    /// A missing directory is not an error. Unreadable or malformed files are
    /// skipped with a warning.
    pub fn load(dir: Option<&Path>) -> Result<Self, CatalogError> {
        let mut catalog = Self::builtin();
        let Some(dir) = dir else {
            return Ok(catalog);
        };
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "Templates directory not found, using built-ins");
            return Ok(catalog);
        }

        let pattern = dir.join("*.json").to_string_lossy().to_string();
        let entries = glob(&pattern).map_err(|e| CatalogError::InvalidTemplate {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        for path in entries.filter_map(|entry| entry.ok()) {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            if id.ends_with("_config") {
                continue;
            }
            match read_template(&path) {
                Ok(template) => {
                    debug!(id = %id, "Loaded template");
                    catalog.templates.insert(id, template);
                }
                Err(e) => warn!(error = %e, "Could not load template"),
            }
        }
        Ok(catalog)
    }

    pub fn get_template(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn list_templates(&self) -> &BTreeMap<String, Template> {
        &self.templates
    }

    /// Display names, falling back to the id for unnamed templates.
    pub fn template_names(&self) -> Vec<String> {
        self.templates
            .iter()
            .map(|(id, t)| {
                if t.name.is_empty() {
                    id.clone()
                } else {
                    t.name.clone()
                }
            })
            .collect()
    }

    pub fn templates_by_category(&self, category: &str) -> BTreeMap<String, Template> {
        self.templates
            .iter()
            .filter(|(_, t)| t.category == category)
            .map(|(id, t)| (id.clone(), t.clone()))
            .collect()
    }

    /// Interview questions for a template.
    ///
    /// Unknown templates get the default set. Otherwise questions come from
    /// the template's sections, padded to at least 8 and capped at 12.
    pub fn generate_questions(&self, template_id: &str) -> Vec<Question> {
        let Some(template) = self.get_template(template_id) else {
            return default_questions();
        };

        let mut questions: Vec<Question> = template
            .sections
            .iter()
            .flat_map(|section| section_questions(section))
            .collect();
        if questions.is_empty() {
            questions = default_questions();
        }

        if questions.len() < MIN_QUESTIONS {
            let missing = MIN_QUESTIONS - questions.len();
            questions.extend(additional_questions().into_iter().take(missing));
        }
        questions.truncate(MAX_QUESTIONS);
        questions
    }
}

fn read_template(path: &Path) -> Result<Template, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| CatalogError::InvalidTemplate {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
