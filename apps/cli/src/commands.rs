//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use copilot_core::{ProgressReporter, RunConfig, load_context, load_email, run_pipeline};
use copilot_gateway::ResponsesClient;
use copilot_shared::{
    AppConfig, PipelineArtifacts, Stage, init_config, load_config, load_config_from,
    resolve_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Support Copilot: draft, review, and finalize support replies.
#[derive(Parser)]
#[command(
    name = "support-copilot",
    version,
    about = "Draft, review, and finalize customer-support emails grounded in a knowledge base.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.support-copilot/support-copilot.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the draft → review → final pipeline for one customer email.
    Run {
        /// Path to the customer email (.txt).
        #[arg(long)]
        email: PathBuf,

        /// Knowledge base directory (.md/.txt files, searched recursively).
        #[arg(long)]
        kb: PathBuf,

        /// Provider-prefixed model for the draft and final stages.
        #[arg(long)]
        draft_model: Option<String>,

        /// Provider-prefixed model for the review stage.
        #[arg(long)]
        review_model: Option<String>,

        /// Output directory for artifacts and run_log.jsonl.
        #[arg(long)]
        outdir: Option<PathBuf>,

        /// Continue when a stage returns no text instead of failing.
        #[arg(long)]
        allow_empty: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "warn,support_copilot=info,copilot_core=info",
        1 => "support_copilot=debug,copilot_core=debug,copilot_gateway=debug,copilot_shared=debug",
        _ => "support_copilot=trace,copilot_core=trace,copilot_gateway=trace,copilot_shared=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries the final email.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            email,
            kb,
            draft_model,
            review_model,
            outdir,
            allow_empty,
        } => {
            let overrides = RunOverrides {
                draft_model,
                review_model,
                outdir,
                allow_empty,
            };
            cmd_run(config_path.as_deref(), &email, &kb, overrides).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

/// CLI flags that take precedence over the config file.
#[derive(Debug, Default)]
struct RunOverrides {
    draft_model: Option<String>,
    review_model: Option<String>,
    outdir: Option<PathBuf>,
    allow_empty: bool,
}

/// Run settings after layering flags over file values over defaults.
#[derive(Debug, PartialEq, Eq)]
struct ResolvedRun {
    draft_model: String,
    review_model: String,
    output_dir: PathBuf,
    allow_empty_output: bool,
}

impl RunOverrides {
    fn apply(self, config: &AppConfig) -> ResolvedRun {
        ResolvedRun {
            draft_model: self
                .draft_model
                .unwrap_or_else(|| config.models.draft.clone()),
            review_model: self
                .review_model
                .unwrap_or_else(|| config.models.review.clone()),
            output_dir: self
                .outdir
                .unwrap_or_else(|| PathBuf::from(&config.pipeline.output_dir)),
            allow_empty_output: self.allow_empty || config.pipeline.allow_empty_output,
        }
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    email: &Path,
    kb: &Path,
    overrides: RunOverrides,
) -> Result<()> {
    let config = resolve_config(config_path)?;

    // Validate API key before doing anything
    let api_key = resolve_api_key(&config.api)?;

    let customer_email = load_email(email)?;
    let knowledge = load_context(kb)?;

    let resolved = overrides.apply(&config);

    let run_config = RunConfig {
        customer_email,
        knowledge,
        company: config.prompts.company.clone(),
        draft_model: resolved.draft_model,
        review_model: resolved.review_model,
        stages: config.stages.clone(),
        output_dir: resolved.output_dir,
        allow_empty_output: resolved.allow_empty_output,
    };

    info!(
        email = %email.display(),
        kb = %kb.display(),
        kb_files = run_config.knowledge.file_count(),
        draft_model = %run_config.draft_model,
        review_model = %run_config.review_model,
        "starting support run"
    );

    let gateway = ResponsesClient::new(&config.api, api_key)?;
    let reporter = CliProgress::new();

    let result = run_pipeline(&gateway, &run_config, &reporter).await;
    if result.is_err() {
        reporter.spinner.finish_and_clear();
    }
    let artifacts = result?;

    let output_dir = std::fs::canonicalize(&run_config.output_dir)
        .map_err(|e| eyre!("cannot resolve output directory: {e}"))?;

    // Print summary
    println!();
    println!("=== FINAL EMAIL ===");
    println!();
    println!("{}", artifacts.final_email);
    println!();
    println!("  Run:     {}", artifacts.run_id);
    for file in &artifacts.files {
        println!(
            "  {:<8} {} ({} bytes)",
            format!("{}:", short_stage(file.stage)),
            file.path.display(),
            file.size_bytes
        );
    }
    println!("  Log:     {}", artifacts.log_path.display());
    println!();
    println!("Saved outputs to: {}", output_dir.display());

    Ok(())
}

fn short_stage(stage: Stage) -> &'static str {
    match stage {
        Stage::DraftAnswer => "Draft",
        Stage::Review => "Review",
        Stage::FinalEmail => "Final",
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: Stage, model: &str) {
        let position = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0) + 1;
        self.spinner
            .set_message(format!("[{position}/3] {stage} via {model}"));
    }

    fn stage_finished(&self, stage: Stage, latency_ms: u64) {
        self.spinner
            .println(format!("  ✓ {stage} ({latency_ms} ms)"));
    }

    fn done(&self, _artifacts: &PipelineArtifacts) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
