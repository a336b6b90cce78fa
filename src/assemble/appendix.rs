//! Framework appendix attached to generated documents on request.

use crate::stage::{Stage, StageResponses};
use crate::tokens::clip_with_ellipsis;

/// Characters kept from each stage response.
pub const APPENDIX_STAGE_CHARS: usize = 800;

const GLOSSARY: &[(&str, &str)] = &[
    ("PRD", "Product Requirements Document"),
    (
        "CIRCLES",
        "Comprehensive framework: Comprehend, Identify, Report, Cut, List, Evaluate, Summarize",
    ),
    ("MVP", "Minimum Viable Product"),
    ("UAT", "User Acceptance Testing"),
    ("BRD", "Business Requirements Document"),
];

/// Render the appendix: every stage output, methodology, glossary, quality
/// notes and resources.
pub fn render_appendix(responses: &StageResponses, model: &str, template_meta: &str) -> String {
    let mut out = String::from("\n---\n\n## 📋 Appendix\n\n### A. Complete CIRCLES Framework Analysis\n\n");
    out.push_str(
        "This document was generated using a comprehensive CIRCLES framework methodology with detailed analysis at each step:\n\n",
    );

    for stage in Stage::ALL {
        let text = responses
            .get(&stage)
            .map(String::as_str)
            .unwrap_or("Analysis not available");
        out.push_str(&format!(
            "**{} - {}:**\n{}\n\n",
            stage.initial(),
            stage.title(),
            clip_with_ellipsis(text, APPENDIX_STAGE_CHARS)
        ));
    }

    let template = if template_meta.trim().is_empty() {
        "Standard"
    } else {
        template_meta
    };
    out.push_str("### B. Generation Methodology\n");
    out.push_str("- **Framework Used:** CIRCLES (7-step structured analysis)\n");
    out.push_str(&format!("- **AI Model:** {}\n", model));
    out.push_str(&format!("- **Template:** {}\n", template));
    out.push_str("- **Generation Method:** Multi-step analysis with context building\n");
    out.push_str("- **Quality Assurance:** Automated CIRCLES coverage analysis\n\n");

    out.push_str("### C. Definitions and Acronyms\n| Term | Definition |\n|------|------------|\n");
    for (term, definition) in GLOSSARY {
        out.push_str(&format!("| {} | {} |\n", term, definition));
    }

    out.push_str("\n### D. Analysis Quality Metrics\n");
    out.push_str("- **Framework Completeness:** All 7 CIRCLES steps executed\n");
    out.push_str("- **Context Integration:** Previous step insights inform subsequent analysis\n");
    out.push_str("- **Insight Extraction:** Key findings mapped to PRD sections\n");
    out.push_str("- **Template Alignment:** Structured output following business standards\n\n");

    out.push_str("### E. Additional Resources\n");
    out.push_str("- CIRCLES Methodology: Product School Framework\n");
    out.push_str("- Quality Evaluation: 6-criteria assessment system\n");
    out.push_str(&format!("- Generation Source: {} completion service\n", model));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appendix_lists_every_stage_and_glossary() {
        let mut responses = StageResponses::new();
        responses.insert(Stage::Comprehend, "x".repeat(1000));
        responses.insert(Stage::Identify, "Busy parents".into());

        let appendix = render_appendix(&responses, "llama-3.1-8b-instant", "");
        assert!(appendix.contains("**C - Comprehend the Situation:**"));
        assert!(appendix.contains("**S - Summarize Recommendations:**\nAnalysis not available"));
        assert!(appendix.contains(&format!("{}...", "x".repeat(800))));
        assert!(!appendix.contains(&"x".repeat(801)));
        assert!(appendix.contains("| MVP | Minimum Viable Product |"));
        assert!(appendix.contains("- **Template:** Standard"));
        assert!(appendix.contains("- **AI Model:** llama-3.1-8b-instant"));
    }
}
