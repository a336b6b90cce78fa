//! Template browsing commands: `prd-forge templates` and `prd-forge questions`.

use anyhow::{Result, bail};

use prd_forge::catalog::TemplateCatalog;
use prd_forge::config::PrdConfig;

fn load_catalog(config: &PrdConfig) -> Result<TemplateCatalog> {
    Ok(TemplateCatalog::load(config.paths.templates_dir.as_deref())?)
}

pub fn cmd_templates(config: &PrdConfig, category: Option<&str>, id: Option<&str>) -> Result<()> {
    let catalog = load_catalog(config)?;

    if let Some(id) = id {
        let Some(template) = catalog.get_template(id) else {
            bail!("Template '{}' not found", id);
        };
        println!();
        println!("{} ({})", template.name, id);
        println!("Category: {}", template.category);
        println!("{}", template.description);
        println!();
        println!("Sections:");
        for section in &template.sections {
            println!("  - {}", section);
        }
        return Ok(());
    }

    let templates = match category {
        Some(category) => catalog.templates_by_category(category),
        None => catalog.list_templates().clone(),
    };
    if templates.is_empty() {
        println!("No templates found");
        return Ok(());
    }

    println!();
    println!("{:<28} {:<16} NAME", "ID", "CATEGORY");
    for (id, template) in &templates {
        println!("{:<28} {:<16} {}", id, template.category, template.name);
    }
    Ok(())
}

pub fn cmd_questions(config: &PrdConfig, template_id: &str, json: bool) -> Result<()> {
    let catalog = load_catalog(config)?;
    let questions = catalog.generate_questions(template_id);

    if json {
        println!("{}", serde_json::to_string_pretty(&questions)?);
        return Ok(());
    }

    for (i, q) in questions.iter().enumerate() {
        let marker = if q.required { "*" } else { " " };
        println!("{:>2}.{} [{}] {}", i + 1, marker, q.category, q.question);
    }
    Ok(())
}
