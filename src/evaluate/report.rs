//! Markdown rendering of an [`Evaluation`].

use super::{Criterion, Evaluation};

fn traffic_light(score: f64) -> &'static str {
    if score >= 80.0 {
        "🟢"
    } else if score >= 60.0 {
        "🟡"
    } else {
        "🔴"
    }
}

fn check(flag: bool) -> &'static str {
    if flag { "✅" } else { "❌" }
}

fn bullet_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n### {}\n", heading));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
}

/// Render the evaluation as a markdown report.
pub fn render_report(evaluation: &Evaluation) -> String {
    let mut out = format!(
        "\n# 📊 PRD Evaluation Report\n\n## Overall Score: {}/100\n\n### Quality Breakdown:\n",
        evaluation.overall_score
    );
    for criterion in Criterion::ALL {
        let score = evaluation.criterion(criterion);
        out.push_str(&format!(
            "- **{}**: {:.1}/100 {}\n",
            criterion.title(),
            score,
            traffic_light(score)
        ));
    }

    out.push_str("\n### CIRCLES Framework Coverage:\n");
    for element in &evaluation.circles_coverage {
        out.push_str(&format!(
            "- **{} - {}**: {} ({:.1}/100)\n",
            element.key,
            element.name,
            check(element.covered),
            element.score
        ));
    }

    bullet_list(&mut out, "💪 Strengths:", &evaluation.strengths);
    bullet_list(&mut out, "⚠️ Areas for Improvement:", &evaluation.weaknesses);
    bullet_list(&mut out, "🎯 Recommendations:", &evaluation.recommendations);

    let meta = &evaluation.metadata;
    out.push_str(&format!(
        "\n### 📈 Document Statistics:\n- **Word Count**: {}\n- **Sections**: {}\n- **Has User Stories**: {}\n- **Has Acceptance Criteria**: {}\n- **Has Success Metrics**: {}\n",
        meta.word_count,
        meta.section_count,
        check(meta.has_user_stories),
        check(meta.has_acceptance_criteria),
        check(meta.has_metrics)
    ));
    out
}
