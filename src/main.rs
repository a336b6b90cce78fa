use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use prd_forge::config::{CONFIG_FILE_NAME, PrdConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "prd-forge")]
#[command(version, about = "Generate product requirements documents with the CIRCLES framework")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to the config file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the seven analysis stages and print the generated document
    Generate {
        /// Product idea to analyze
        #[arg(short, long)]
        idea: String,

        /// Template id
        #[arg(short, long, default_value = prd_forge::catalog::DEFAULT_TEMPLATE_ID)]
        template: String,

        /// Extra context as key=value, repeatable
        #[arg(short, long = "context", value_parser = cmd::parse_context_pair)]
        context: Vec<(String, String)>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// Reuse a session id instead of generating one
        #[arg(long)]
        session_id: Option<String>,

        /// Attach the framework appendix
        #[arg(long)]
        appendix: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also run the quality evaluator on the document
        #[arg(long)]
        evaluate: bool,
    },
    /// List available templates
    Templates {
        /// Only templates in this category
        #[arg(long)]
        category: Option<String>,

        /// Show one template's sections
        #[arg(long)]
        id: Option<String>,
    },
    /// Print the interview questions for a template
    Questions {
        template: String,

        #[arg(long)]
        json: bool,
    },
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli);

    let config = PrdConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?
        .with_env_overrides();

    match &cli.command {
        Commands::Generate {
            idea,
            template,
            context,
            model,
            session_id,
            appendix,
            json,
            output,
            evaluate,
        } => {
            let options = cmd::GenerateOptions {
                idea: idea.clone(),
                template: template.clone(),
                context: context.clone(),
                model: model.clone(),
                session_id: session_id.clone(),
                appendix: *appendix,
                json: *json,
                output: output.clone(),
                evaluate: *evaluate,
            };
            cmd::cmd_generate(config, options).await?;
        }
        Commands::Templates { category, id } => {
            cmd::cmd_templates(&config, category.as_deref(), id.as_deref())?
        }
        Commands::Questions { template, json } => cmd::cmd_questions(&config, template, *json)?,
    }

    Ok(())
}
