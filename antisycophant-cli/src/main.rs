//! AntiSycophant CLI
//!
//! Answers a query under several personas and lets the model judge which
//! answer is most correct rather than most agreeable.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use antisycophant_agents::{
    create_anthropic_backend, create_backend, create_gemini_backend, AnthropicConfig,
    GeminiConfig, OpenAIBackendConfig, PersonaCatalog, SharedBackend, DEFAULT_GEMINI_MODEL,
};
use antisycophant_runtime::{Pipeline, PipelineConfig, RunOutput};

#[derive(Parser)]
#[command(name = "antisycophant")]
#[command(author, version, about = "AntiSycophant: LLM-as-a-judge over persona answers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate persona answers for a query and judge them
    Ask {
        /// The question or statement to answer
        #[arg(short, long)]
        query: String,

        #[command(flatten)]
        backend: BackendArgs,

        /// Directory of persona TOML files (default: embedded personas)
        #[arg(long)]
        personas_dir: Option<PathBuf>,

        /// Generate candidates one at a time instead of concurrently
        #[arg(long)]
        sequential: bool,

        /// Also print every candidate answer
        #[arg(long)]
        show_candidates: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Write a Markdown report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the persona catalog in generation order
    Personas {
        /// Directory of persona TOML files (default: embedded personas)
        #[arg(long)]
        personas_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct BackendArgs {
    /// LLM model to use (default depends on the provider)
    #[arg(short, long)]
    model: Option<String>,

    /// Gemini API key (or set GEMINI_API_KEY env var)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_key: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    openrouter_key: Option<String>,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_key: Option<String>,

    /// Use OpenAI instead of Gemini
    #[arg(long)]
    openai: bool,

    /// Use OpenRouter instead of Gemini
    #[arg(long)]
    openrouter: bool,

    /// Use Anthropic instead of Gemini
    #[arg(long)]
    anthropic: bool,

    /// Override the API base URL of the selected provider
    #[arg(long)]
    base_url: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum tokens per generation
    #[arg(long)]
    max_tokens: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Ask {
            query,
            backend,
            personas_dir,
            sequential,
            show_candidates,
            json,
            output,
        } => {
            let backend = build_backend(&backend)?;
            let catalog = load_catalog(personas_dir.as_deref())?;
            let pipeline = Pipeline::new(PipelineConfig {
                backend: backend.clone(),
                catalog,
                concurrent: !sequential,
            })?;

            let result = pipeline.run_with_details(&query).await;

            if json {
                print_json(&result, backend.model_name())?;
            } else {
                print_result(&result, show_candidates);
            }

            if let Some(path) = output {
                write_report(&path, &query, &result, backend.model_name())?;
                eprintln!("📄 Report saved to: {}", path.display());
            }
        }
        Commands::Personas { personas_dir } => {
            let catalog = load_catalog(personas_dir.as_deref())?;
            list_personas(&catalog);
        }
    }

    Ok(())
}

/// Construct the configured backend. A missing key is fatal.
fn build_backend(args: &BackendArgs) -> Result<SharedBackend> {
    let backend = if args.openrouter {
        let key = args.openrouter_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("OpenRouter API key required. Set OPENROUTER_API_KEY or use --openrouter-key")
        })?;
        let model = args.model.as_deref().unwrap_or("openai/gpt-4o-mini");
        create_backend(apply_openai_options(OpenAIBackendConfig::openrouter(key, model), args))?
    } else if args.openai {
        let key = args.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("OpenAI API key required. Set OPENAI_API_KEY or use --api-key")
        })?;
        let model = args.model.as_deref().unwrap_or("gpt-4o-mini");
        let mut config = OpenAIBackendConfig::openai(key, model);
        config.base_url = args.base_url.clone();
        create_backend(apply_openai_options(config, args))?
    } else if args.anthropic {
        let key = args.anthropic_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Anthropic API key required. Set ANTHROPIC_API_KEY or use --anthropic-key")
        })?;
        let model = args.model.as_deref().unwrap_or("claude-sonnet-4-20250514");
        let mut config = AnthropicConfig::new(key, model);
        if let Some(base_url) = &args.base_url {
            config = config.with_base_url(base_url);
        }
        config.temperature = args.temperature;
        if let Some(max_tokens) = args.max_tokens {
            config.max_tokens = max_tokens.into();
        }
        create_anthropic_backend(config)?
    } else {
        // Default: Gemini
        let key = args.gemini_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Gemini API key required. Set GEMINI_API_KEY or use --gemini-key")
        })?;
        let model = args.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        let mut config = GeminiConfig::new(key, model);
        if let Some(base_url) = &args.base_url {
            config = config.with_base_url(base_url);
        }
        config.temperature = args.temperature;
        config.max_tokens = args.max_tokens.map(u32::from);
        create_gemini_backend(config)?
    };

    Ok(backend)
}

fn apply_openai_options(mut config: OpenAIBackendConfig, args: &BackendArgs) -> OpenAIBackendConfig {
    if let Some(temperature) = args.temperature {
        config.temperature = temperature;
    }
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    config
}

fn load_catalog(dir: Option<&Path>) -> Result<PersonaCatalog> {
    match dir {
        Some(dir) => PersonaCatalog::load_from_dir(dir)
            .with_context(|| format!("loading personas from {}", dir.display())),
        None => Ok(PersonaCatalog::load_embedded()),
    }
}

fn print_result(result: &RunOutput, show_candidates: bool) {
    let response = &result.response;

    println!("{}\n", response.winner_banner);
    println!("🏆 Final Answer\n");
    println!("{}", response.final_answer);

    if show_candidates && !response.candidates_view.is_empty() {
        println!("\n{}", "=".repeat(60));
        println!("All Generated Candidates\n");
        println!("{}", response.candidates_view.trim_end());
    }
}

fn print_json(result: &RunOutput, model: &str) -> Result<()> {
    let value = serde_json::json!({
        "request_id": result.request_id.to_string(),
        "model": model,
        "final_answer": result.response.final_answer,
        "winner_banner": result.response.winner_banner,
        "candidates_view": result.response.candidates_view,
        "selection": result.selection,
        "candidates": result.candidates,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn write_report(path: &Path, query: &str, result: &RunOutput, model: &str) -> Result<()> {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let response = &result.response;

    let report = format!(
        "# AntiSycophant Report\n\n\
         - Generated: {}\n\
         - Model: {}\n\
         - Request: {}\n\n\
         ## Query\n\n{}\n\n\
         {}\n\n\
         ## Final Answer\n\n{}\n\n\
         ## All Candidates\n\n{}",
        timestamp,
        model,
        result.request_id,
        query,
        response.winner_banner,
        response.final_answer,
        response.candidates_view
    );

    fs::write(path, report).with_context(|| format!("writing report to {}", path.display()))?;
    Ok(())
}

fn list_personas(catalog: &PersonaCatalog) {
    println!("🎭 {} personas (generation order)\n", catalog.len());
    for (i, persona) in catalog.iter().enumerate() {
        let marker = if persona.is_baseline() { " [baseline: raw query]" } else { "" };
        println!("{}. {}{}", i + 1, persona.name(), marker);
        if let Some(description) = &persona.persona.description {
            println!("   {}", description);
        }
    }
}
