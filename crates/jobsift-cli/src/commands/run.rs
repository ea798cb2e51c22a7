//! `jobsift run` -- process the input queue.
//!
//! Flags override values from the config file. The credential is resolved
//! and the input checked before any file is opened for writing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use jobsift_core::{
    CheckpointStore, Classifier, ClassifierOptions, Driver, DriverOptions, FailureLedger,
    OutputLog, PromptBuilder, RunReport,
};
use jobsift_llm::{LlmProviderConfig, OpenAiCompatProvider};
use jobsift_types::config::{Config, ProviderSettings, QueueMode};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Arguments for `jobsift run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input CSV. Processed rows are removed from it unless --keep-source.
    #[arg(long)]
    pub input: PathBuf,

    /// Output CSV. Appended to if it already has content.
    #[arg(long)]
    pub output: PathBuf,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Model name.
    #[arg(long)]
    pub model: Option<String>,

    /// System instructions.
    #[arg(long)]
    pub system: Option<String>,

    /// User prompt template. Supports {row_json} and {<column name>}.
    #[arg(long, conflicts_with = "user_template_file")]
    pub user_template: Option<String>,

    /// Read the user prompt template from a file.
    #[arg(long)]
    pub user_template_file: Option<PathBuf>,

    /// Seconds to wait between records.
    #[arg(long)]
    pub sleep: Option<f64>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Calls per prompt candidate.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Stop after this many rows.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Leave the input file untouched.
    #[arg(long)]
    pub keep_source: bool,

    /// Append fallen-back rows to this JSONL file.
    #[arg(long)]
    pub failures: Option<PathBuf>,

    /// API key (defaults to the env var named in config, OPENAI_API_KEY).
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Fold command-line flags into `config`.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) -> anyhow::Result<()> {
    if let Some(model) = &args.model {
        config.classifier.model = model.clone();
    }
    if let Some(system) = &args.system {
        config.prompts.system = system.clone();
    }
    if let Some(template) = &args.user_template {
        config.prompts.user_template = template.clone();
    }
    if let Some(path) = &args.user_template_file {
        config.prompts.user_template = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read template {}", path.display()))?;
    }
    if let Some(sleep) = args.sleep {
        config.pipeline.delay_secs = sleep;
    }
    if let Some(temperature) = args.temperature {
        config.classifier.temperature = temperature;
    }
    if let Some(max_tokens) = args.max_tokens {
        config.classifier.max_tokens = max_tokens;
    }
    if let Some(max_retries) = args.max_retries {
        config.classifier.max_attempts = max_retries;
    }
    if args.limit.is_some() {
        config.pipeline.limit = args.limit;
    }
    if args.keep_source {
        config.pipeline.queue_mode = QueueMode::Cursor;
    }
    if let Some(failures) = &args.failures {
        config.pipeline.failures_path = Some(failures.display().to_string());
    }
    if let Some(key) = &args.api_key {
        config.provider.api_key = key.as_str().into();
    }
    if let Some(base_url) = &args.base_url {
        config.provider.base_url = base_url.clone();
    }
    Ok(())
}

fn provider_config(settings: &ProviderSettings) -> LlmProviderConfig {
    LlmProviderConfig {
        name: settings.name.clone(),
        base_url: settings.base_url.clone(),
        headers: settings.headers.clone(),
        timeout_secs: Some(settings.timeout_secs),
    }
}

/// Run the pipeline.
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    let api_key = config.resolve_api_key()?;
    if !args.input.is_file() {
        anyhow::bail!("input file not found: {}", args.input.display());
    }

    let provider = OpenAiCompatProvider::with_api_key(
        provider_config(&config.provider),
        api_key.expose().to_owned(),
    )
    .context("failed to build HTTP client")?;
    let classifier = Classifier::new(
        Arc::new(provider),
        ClassifierOptions::from_settings(&config.classifier),
    );

    let output = OutputLog::open(&args.output)?;
    let mut driver = Driver::new(
        PromptBuilder::from_settings(&config.prompts),
        classifier,
        CheckpointStore::new(&args.input),
        output,
        DriverOptions::from_settings(&config.pipeline),
    );
    if let Some(path) = &config.pipeline.failures_path {
        driver = driver.with_ledger(FailureLedger::new(path));
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping at the next safe point");
            trigger.cancel();
        }
    });

    let report = driver.run(&cancel).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Processed:   {}", report.processed);
    println!("Classified:  {}", report.classified);
    println!("Fell back:   {}", report.fell_back);
    println!("Remaining:   {}", report.remaining);
    if report.cancelled {
        println!("Stopped early: interrupted");
    }
}
