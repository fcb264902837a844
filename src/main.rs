// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use conclave::config::CONFIG;
use conclave::council::{
    artifact::{build_markdown, preview, write_markdown, ArtifactInput},
    catalog, choose_context,
    prompts::find_template,
    resolve_initial_models, run_council,
    slug::{generate_slug, SlugOptions},
    ContextMode, HistoryRing, LogSink, RunInputs,
};
use conclave::llm::{ModelClient, OpenAiClient};
use conclave::server::{self, AppState};

const PREVIEW_LEN: usize = 200;

#[derive(Parser)]
#[command(name = "conclave", about = "Multi-model council deliberation", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (REST + SSE)
    Serve {
        /// Bind host (overrides CONCLAVE_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides CONCLAVE_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one council deliberation and write a markdown artifact
    Run {
        /// The question for the council
        prompt: Option<String>,
        /// Use a canned prompt template (explain, debug, review, summarize)
        #[arg(long, conflicts_with = "prompt")]
        template: Option<String>,
        /// Comma-separated model ids (defaults to the resolved selection)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        /// Chair model (defaults to the first selected model)
        #[arg(long)]
        chair: Option<String>,
        /// Context behavior
        #[arg(long, value_enum, default_value = "auto")]
        context: ContextMode,
        /// File whose contents serve as the document context
        #[arg(long)]
        context_file: Option<PathBuf>,
        /// Artifact output directory (overrides CONCLAVE_ARTIFACTS_DIR)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { host, port } => serve(host, port).await,
        Command::Run { prompt, template, models, chair, context, context_file, out_dir } => {
            run_once(prompt, template, models, chair, context, context_file, out_dir).await
        }
    }
}

async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| CONFIG.host.clone());
    let port = port.unwrap_or(CONFIG.port);

    let client: Arc<dyn ModelClient> = Arc::new(OpenAiClient::from_config(&CONFIG)?);
    let selection = resolve_models_from_config();
    let default_model = selection.first().cloned().unwrap_or_else(|| "gpt-5.1".to_string());

    info!("council selection: {}", selection.join(", "));

    let state = AppState {
        client,
        history: Arc::new(Mutex::new(HistoryRing::new(CONFIG.history_capacity))),
        max_models: CONFIG.max_models,
        default_model,
    };
    server::run(&host, port, state).await
}

/// Sticky saved selection, then preferred defaults, then quality ranking.
fn resolve_models_from_config() -> Vec<String> {
    resolve_initial_models(
        &CONFIG.saved_models,
        &CONFIG.default_models,
        &catalog(),
        CONFIG.max_models,
    )
}

async fn run_once(
    prompt: Option<String>,
    template: Option<String>,
    models: Vec<String>,
    chair: Option<String>,
    context_mode: ContextMode,
    context_file: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let prompt = match (prompt, template) {
        (Some(p), _) => p,
        (None, Some(id)) => find_template(&id)
            .map(|t| t.body.to_string())
            .ok_or_else(|| anyhow::anyhow!("unknown template '{}'", id))?,
        (None, None) => anyhow::bail!("a prompt or --template is required"),
    };

    let document = match &context_file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => String::new(),
    };
    let context = choose_context("", &document, context_mode);

    let models = if models.is_empty() { resolve_models_from_config() } else { models };
    let chair = match chair.or_else(|| CONFIG.chair.clone()) {
        Some(chair) => chair,
        None => models.first().cloned().unwrap_or_default(),
    };

    let inputs = RunInputs {
        prompt: prompt.clone(),
        context_text: context.text().map(str::to_string),
        models,
        chair,
    };

    let client: Arc<dyn ModelClient> = Arc::new(OpenAiClient::from_config(&CONFIG)?);
    let sink = Arc::new(LogSink);

    info!("running council: models=[{}] chair={}", inputs.models.join(", "), inputs.chair);
    let result = run_council(&inputs, client.clone(), sink, CONFIG.max_models).await?;

    let now = Utc::now();
    let context_preview = context.text().map(|t| preview(t, PREVIEW_LEN));
    let slug = generate_slug(
        client,
        SlugOptions {
            model: &inputs.chair,
            prompt: &inputs.prompt,
            context_preview: context_preview.as_deref(),
            timeout_ms: CONFIG.slug_timeout_ms,
            now,
        },
    )
    .await;

    let run_id = Uuid::new_v4().to_string();
    let content = build_markdown(&ArtifactInput {
        slug: &slug,
        prompt: &inputs.prompt,
        prompt_preview: &preview(&inputs.prompt, PREVIEW_LEN),
        context_preview: context_preview.as_deref(),
        context_kind: context.kind(),
        models: &inputs.models,
        chair: &inputs.chair,
        stage1: &result.stage1,
        stage2: &result.stage2,
        final_answer: &result.final_answer,
        timestamp: now,
        version: env!("CARGO_PKG_VERSION"),
        run_id: Some(&run_id),
    });

    let dir = out_dir.unwrap_or_else(|| PathBuf::from(&CONFIG.artifacts_dir));
    let path = write_markdown(&dir, &slug, &content).await?;
    info!("artifact written to {}", path.display());

    println!("\n=== Final answer ({}) ===\n{}", inputs.chair, result.final_answer);
    Ok(())
}
