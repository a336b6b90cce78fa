//! Document generation command: `prd-forge generate`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use prd_forge::config::PrdConfig;
use prd_forge::evaluate::{Evaluation, render_report};
use prd_forge::orchestrator::ConversationContext;
use prd_forge::{GenerationRequest, GenerationResult, PrdAgent};

pub struct GenerateOptions {
    pub idea: String,
    pub template: String,
    pub context: Vec<(String, String)>,
    pub model: Option<String>,
    pub session_id: Option<String>,
    pub appendix: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub evaluate: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    result: &'a GenerationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation: Option<&'a Evaluation>,
}

/// Parse a `key=value` context argument.
pub fn parse_context_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Context values that parse as JSON keep their structure; anything else is a string.
fn build_context(pairs: &[(String, String)]) -> ConversationContext {
    pairs
        .iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.clone()));
            (key.clone(), value)
        })
        .collect()
}

pub async fn cmd_generate(mut config: PrdConfig, options: GenerateOptions) -> Result<()> {
    if options.idea.trim().is_empty() {
        bail!("--idea must not be empty");
    }
    if let Some(model) = &options.model {
        config.completion.model = model.clone();
    }

    let agent = PrdAgent::from_config(config).context("Failed to initialize generator")?;

    let mut request = GenerationRequest::new(&options.idea)
        .template(&options.template)
        .context(build_context(&options.context))
        .with_appendix(options.appendix);
    if let Some(id) = &options.session_id {
        request = request.session_id(id);
    }

    let result = agent.generate(request).await?;
    let evaluation = options
        .evaluate
        .then(|| agent.evaluate_document(&result.prd_document));

    let rendered = if options.json {
        serde_json::to_string_pretty(&JsonOutput {
            result: &result,
            evaluation: evaluation.as_ref(),
        })?
    } else {
        let mut text = result.prd_document.clone();
        if let Some(evaluation) = &evaluation {
            text.push_str("\n\n");
            text.push_str(&render_report(evaluation));
        }
        text
    };

    match &options.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), session_id = %result.session_id, "Document written");
            eprintln!(
                "Coverage: {:.1}% ({})",
                result.circles_analysis.overall_coverage, result.circles_analysis.analysis_quality
            );
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context_pair() {
        assert_eq!(
            parse_context_pair("budget=25000").unwrap(),
            ("budget".to_string(), "25000".to_string())
        );
        assert_eq!(
            parse_context_pair("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_context_pair("novalue").is_err());
        assert!(parse_context_pair("=x").is_err());
    }

    #[test]
    fn test_build_context_keeps_json_structure() {
        let ctx = build_context(&[
            ("budget".into(), "25000".into()),
            ("audience".into(), "busy parents".into()),
            ("tags".into(), r#"["a","b"]"#.into()),
        ]);
        assert_eq!(ctx["budget"], Value::from(25000));
        assert_eq!(ctx["audience"], Value::String("busy parents".into()));
        assert!(ctx["tags"].is_array());
    }
}
