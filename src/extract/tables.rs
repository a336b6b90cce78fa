//! Markdown table rows synthesized from insights.
//!
//! Every generator returns at least one row. When nothing list-like can be
//! found in the insight text, fixed default rows are emitted instead.

use std::sync::LazyLock;

use regex::Regex;

use super::insights::{InsightBundle, InsightKey};
use crate::tokens::clip_chars;

/// Rows kept in the requirements table.
const MAX_REQUIREMENTS: usize = 8;
/// Rows kept in the personas table.
const MAX_PERSONAS: usize = 4;
/// Rows kept in the prioritization table.
const MAX_PRIORITIZED: usize = 5;

/// Characters stripped from the front of a list line.
const LIST_MARKUP: &str = "-*•○▪▫0123456789. ";

// "1." through "19." at the start of a line
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[1-9]|1[0-9])\.").unwrap());

fn starts_with_list_marker(line: &str) -> bool {
    line.starts_with(['-', '*', '•']) || NUMBERED_LINE.is_match(line)
}

fn strip_list_markup(line: &str) -> &str {
    line.trim_start_matches(|c| LIST_MARKUP.contains(c)).trim()
}

/// Table cells must not break the row.
fn cell(text: &str) -> String {
    text.replace('|', "/").replace('\n', " ")
}

/// Requirement rows: `| REQ-001 | Core | MVP | Priority | Requirement | ... | Effort |`.
pub fn requirements_table(insights: &InsightBundle) -> String {
    let all_text = format!(
        "{}\n{}\n{}",
        insights.get(InsightKey::FunctionalNeeds),
        insights.get(InsightKey::PriorityFeatures),
        insights.get(InsightKey::CustomerNeedsSummary)
    );

    let mut features: Vec<String> = Vec::new();
    for line in all_text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        let list_like = starts_with_list_marker(line)
            || line.starts_with(['○', '▪', '▫'])
            || lower.contains("feature")
            || lower.contains("capability")
            || lower.contains("function");
        if !list_like {
            continue;
        }
        let feature = strip_list_markup(line);
        let len = feature.chars().count();
        if len > 15 && len < 100 {
            features.push(feature.to_string());
        }
    }
    if features.is_empty() {
        features = default_features(&all_text);
    }

    features
        .iter()
        .take(MAX_REQUIREMENTS)
        .enumerate()
        .map(|(i, feature)| requirement_row(i, feature))
        .collect::<Vec<_>>()
        .join("\n")
}

fn requirement_row(index: usize, feature: &str) -> String {
    let lower = feature.to_lowercase();
    let priority = match index {
        0..=2 => "Must Have",
        3..=5 => "Should Have",
        _ => "Could Have",
    };
    let mvp = if index < 3 { "Yes" } else { "No" };
    let user_story = if lower.starts_with("as a") {
        feature.to_string()
    } else {
        format!("As a user, I want to {}", lower)
    };
    let acceptance = format!(
        "Given the system is operational, when I {}..., then the feature works as expected",
        clip_chars(feature, 30).to_lowercase()
    );
    let owner = if lower.contains("business") {
        "Product"
    } else {
        "Engineering"
    };
    let validation = if priority == "Must Have" { "QA" } else { "UAT" };
    let effort = match index {
        0..=1 => "Large",
        2..=4 => "Medium",
        _ => "Small",
    };

    format!(
        "| REQ-{:03} | Core | {} | {} | {} | {} | {} | {} | {} | {} |",
        index + 1,
        mvp,
        priority,
        cell(feature),
        cell(&user_story),
        cell(&acceptance),
        owner,
        validation,
        effort
    )
}

const ACTION_WORDS: [&str; 15] = [
    "create", "manage", "view", "edit", "delete", "search", "filter", "sort", "export", "import",
    "configure", "monitor", "track", "analyze", "report",
];

/// Feature names derived from action words and domain vocabulary.
fn default_features(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let has = |w: &str| words.contains(&w);

    let mut features: Vec<String> = ACTION_WORDS
        .iter()
        .filter(|action| has(action))
        .map(|action| {
            let mut title = action.to_string();
            title[..1].make_ascii_uppercase();
            format!("{} functionality", title)
        })
        .collect();

    let domain = [
        (has("user"), "User management and authentication"),
        (has("data"), "Data processing and storage"),
        (has("interface") || has("ui"), "User interface and experience"),
        (has("integration"), "System integration capabilities"),
        (has("security"), "Security and access control"),
        (has("report") || has("analytics"), "Reporting and analytics"),
    ];
    features.extend(
        domain
            .iter()
            .filter(|(present, _)| *present)
            .map(|(_, name)| name.to_string()),
    );

    if features.is_empty() {
        features = [
            "Core business functionality",
            "User authentication and access",
            "Data management and storage",
            "User interface and navigation",
            "System configuration and settings",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
    }
    features.truncate(MAX_REQUIREMENTS);
    features
}

/// One customer persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub demographics: String,
    pub goals: String,
    pub pain_points: String,
    pub use_cases: String,
    pub metrics: String,
}

impl Persona {
    fn new(
        name: &str,
        demographics: &str,
        goals: &str,
        pain_points: &str,
        use_cases: &str,
        metrics: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            demographics: demographics.to_string(),
            goals: goals.to_string(),
            pain_points: pain_points.to_string(),
            use_cases: use_cases.to_string(),
            metrics: metrics.to_string(),
        }
    }

    fn row(&self) -> String {
        format!(
            "| {} | {} | {} | {} | {} | {} |",
            cell(clip_chars(&self.name, 30)),
            cell(clip_chars(&self.demographics, 50)),
            cell(clip_chars(&self.goals, 60)),
            cell(clip_chars(&self.pain_points, 60)),
            cell(clip_chars(&self.use_cases, 60)),
            cell(clip_chars(&self.metrics, 50)),
        )
    }
}

/// Persona rows: `| Name | Demographics | Goals | Pain Points | Use Cases | Metrics |`.
pub fn personas_table(insights: &InsightBundle) -> String {
    let text = format!(
        "{} {} {}",
        insights.get(InsightKey::CustomerIdentification),
        insights.get(InsightKey::CustomerSegments),
        insights.get(InsightKey::CustomerContext)
    );

    let mut personas = extract_personas(&text);
    if personas.is_empty() {
        personas = default_personas(&text);
    }

    personas
        .iter()
        .take(MAX_PERSONAS)
        .map(Persona::row)
        .collect::<Vec<_>>()
        .join("\n")
}

const PERSONA_KEYWORDS: [&str; 6] = [
    "persona",
    "user type",
    "customer segment",
    "target user",
    "primary user",
    "secondary user",
];

const ROLE_KEYWORDS: [&str; 8] = [
    "manager",
    "administrator",
    "analyst",
    "developer",
    "executive",
    "employee",
    "customer",
    "client",
];

fn mentions(line: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| line.contains(k))
}

/// Personas opened by persona or role vocabulary, with attributes from the
/// lines that follow.
pub fn extract_personas(text: &str) -> Vec<Persona> {
    let mut personas = Vec::new();
    let mut current: Option<Persona> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();

        if mentions(&lower, &PERSONA_KEYWORDS) || mentions(&lower, &ROLE_KEYWORDS) {
            if let Some(done) = current.take() {
                personas.push(done);
            }
            let name = if line.chars().count() < 40 {
                line.to_string()
            } else {
                let first = line.split_whitespace().next().unwrap_or("Target");
                format!("{} User", first)
            };
            current = Some(Persona::new(
                name.replace(':', "").trim(),
                "Professional user",
                "Achieve efficiency and productivity",
                "Current process limitations",
                "Daily operational workflows",
                "Time saved and accuracy improved",
            ));
            continue;
        }

        let Some(persona) = current.as_mut() else {
            continue;
        };
        if mentions(&lower, &["age", "demographic", "background", "experience"]) {
            persona.demographics = clip_chars(line, 50).to_string();
        } else if mentions(&lower, &["goal", "objective", "want", "need"]) {
            persona.goals = clip_chars(line, 60).to_string();
        } else if mentions(&lower, &["pain", "problem", "challenge", "frustration"]) {
            persona.pain_points = clip_chars(line, 60).to_string();
        } else if mentions(&lower, &["use case", "scenario", "workflow", "task"]) {
            persona.use_cases = clip_chars(line, 60).to_string();
        } else if mentions(&lower, &["success", "metric", "measure", "kpi"]) {
            persona.metrics = clip_chars(line, 50).to_string();
        }
    }

    if let Some(done) = current {
        personas.push(done);
    }
    personas
}

/// Personas chosen from the business vocabulary of the text.
fn default_personas(text: &str) -> Vec<Persona> {
    let lower = text.to_lowercase();
    let mut personas = Vec::new();

    if mentions(&lower, &["enterprise", "business", "corporate", "organization"]) {
        personas.push(Persona::new(
            "Business User",
            "Professional, 25-45 years, business domain expertise",
            "Streamline operations and improve efficiency",
            "Manual processes and data silos",
            "Daily business operations and reporting",
            "Time savings and process efficiency",
        ));
        personas.push(Persona::new(
            "Administrative User",
            "Professional, 30-50 years, admin experience",
            "Manage system configuration and user access",
            "Complex administrative tasks",
            "System administration and user management",
            "System uptime and user satisfaction",
        ));
    }
    if mentions(&lower, &["customer", "client", "external", "public"]) {
        personas.push(Persona::new(
            "End Customer",
            "Varied demographics, digital natives",
            "Quick and easy service access",
            "Complicated interfaces and slow responses",
            "Self-service and information access",
            "Task completion rate and satisfaction",
        ));
    }
    if mentions(&lower, &["technical", "developer", "system"]) {
        personas.push(Persona::new(
            "Technical User",
            "Technical professional, 25-40 years",
            "Integrate and maintain technical systems",
            "Limited documentation and complex APIs",
            "System integration and maintenance",
            "Integration success and system reliability",
        ));
    }

    if personas.is_empty() {
        personas = vec![
            Persona::new(
                "Primary User",
                "Professional user, varied background",
                "Accomplish tasks efficiently and effectively",
                "Current process inefficiencies",
                "Core product functionality usage",
                "Task completion and user satisfaction",
            ),
            Persona::new(
                "Secondary User",
                "Occasional user, basic technical skills",
                "Access information and perform basic tasks",
                "Complexity and learning curve",
                "Periodic information access and basic operations",
                "Ease of use and success rate",
            ),
        ];
    }
    personas
}

/// Stakeholder rows. The matrix is the same for every product.
pub fn stakeholder_table(_insights: &InsightBundle) -> String {
    const ROWS: [[&str; 6]; 4] = [
        ["Product Owner", "Business Lead", "High", "High", "Daily", "Business outcomes"],
        ["End Users", "Primary Users", "Medium", "High", "As needed", "Usability & value"],
        ["Development Team", "Implementation", "High", "Medium", "Daily", "Technical feasibility"],
        ["Executive Sponsor", "Decision Maker", "High", "Medium", "Weekly", "ROI & timeline"],
    ];
    ROWS.iter()
        .map(|row| format!("| {} |", row.join(" | ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prioritization rows: `| Feature | Value | Effort | Risk | Score | Phase | Owner |`.
pub fn prioritization_table(insights: &InsightBundle) -> String {
    let mut features: Vec<String> = Vec::new();
    for key in [InsightKey::FunctionalNeeds, InsightKey::PriorityFeatures] {
        for line in insights.get(key).lines().map(str::trim) {
            if !starts_with_list_marker(line) {
                continue;
            }
            let feature = strip_list_markup(line);
            if feature.chars().count() > 10 {
                features.push(clip_chars(feature, 50).to_string());
            }
        }
    }
    if features.is_empty() {
        features = [
            "Core functionality implementation",
            "User authentication and access",
            "Data management and storage",
            "User interface and experience",
            "Integration capabilities",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
    }

    const VALUES: [&str; 5] = ["High", "High", "Medium", "Medium", "Low"];
    const PHASES: [&str; 5] = ["MVP", "MVP", "Phase 1", "Phase 1", "Phase 2"];

    features
        .iter()
        .take(MAX_PRIORITIZED)
        .enumerate()
        .map(|(i, feature)| {
            let value = VALUES[i];
            let (effort, risk, score) = match value {
                "High" => ("Medium", "Low", "90"),
                "Medium" => ("Low", "Medium", "70"),
                _ => ("Low", "Medium", "50"),
            };
            format!(
                "| {} | {} | {} | {} | {} | {} | TBD |",
                cell(feature),
                value,
                effort,
                risk,
                score,
                PHASES[i]
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
