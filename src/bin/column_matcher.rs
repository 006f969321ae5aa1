//! column-matcher — 使用生成式模型匹配两列表格数据的命令行工具
//!
//! Usage:
//!   column-matcher match --source a.csv --source-column Name --target b.csv --target-column Name
//!   column-matcher plan --target b.csv --target-column Name

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use column_matcher::batch::Batcher;
use column_matcher::tabular::{read_column, write_csv, write_json};
use column_matcher::tokens::CharacterEstimator;
use column_matcher::{ColumnMatcher, GeminiClient, MatcherConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const JSON_OUTPUT: &str = "ColumnMatcher.json";
const CSV_OUTPUT: &str = "ColumnMatcher.csv";

#[derive(Parser)]
#[command(name = "column-matcher")]
#[command(version, about = "Match a target column against a source column with Gemini", long_about = None)]
#[command(after_help = "ENVIRONMENT:
    GEMINI_API_KEY                      API key (a .env file in the working directory is read)
    COLUMN_MATCHER_MODEL                Model identifier override
    COLUMN_MATCHER_CALLS_PER_MINUTE     Call quota per rolling minute (0 disables)
    COLUMN_MATCHER_TOKEN_CEILING        Token budget per batch
    COLUMN_MATCHER_MAX_CONCURRENCY      Batches in flight at once
    RUST_LOG                            Log filter (default: info)")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match every target value against the source column
    Match(MatchArgs),
    /// Show how the target column would be batched, without calling the model
    Plan(PlanArgs),
}

#[derive(Args)]
struct MatchArgs {
    /// CSV file holding the source column
    #[arg(long)]
    source: PathBuf,

    /// Header of the source column
    #[arg(long)]
    source_column: String,

    /// CSV file holding the target column
    #[arg(long)]
    target: PathBuf,

    /// Header of the target column
    #[arg(long)]
    target_column: String,

    /// Directory for ColumnMatcher.json and ColumnMatcher.csv
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args)]
struct PlanArgs {
    /// CSV file holding the target column
    #[arg(long)]
    target: PathBuf,

    /// Header of the target column
    #[arg(long)]
    target_column: String,

    /// Characters per token for the offline estimate
    #[arg(long, default_value_t = 4.0)]
    chars_per_token: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `env = "GEMINI_API_KEY"` sees keys from .env.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Match(args) => cmd_match(args, config).await,
        Commands::Plan(args) => cmd_plan(args, config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<MatcherConfig> {
    let config = match path {
        Some(p) => MatcherConfig::from_yaml_file(p)
            .with_context(|| format!("reading config {}", p.display()))?,
        None => MatcherConfig::default(),
    };
    let config = config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

async fn cmd_match(args: MatchArgs, config: MatcherConfig) -> Result<()> {
    let source = read_column(&args.source, &args.source_column)
        .with_context(|| format!("reading source column from {}", args.source.display()))?;
    let target = read_column(&args.target, &args.target_column)
        .with_context(|| format!("reading target column from {}", args.target.display()))?;

    let mut builder = GeminiClient::builder()
        .model(config.model.clone())
        .base_url(config.base_url.clone())
        .generation(config.generation.clone())
        .timeout(Duration::from_secs(config.timeout_secs));
    if let Some(key) = args.api_key {
        builder = builder.api_key(key);
    }
    let model = Arc::new(builder.build()?);

    let matcher = ColumnMatcher::new(model, config)?;
    let result = matcher
        .match_columns(&source, &target, &args.source_column, &args.target_column)
        .await?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let json_path = args.output_dir.join(JSON_OUTPUT);
    let csv_path = args.output_dir.join(CSV_OUTPUT);
    write_json(&json_path, &result, &args.target_column, &args.source_column)?;
    write_csv(&csv_path, &result, &args.target_column, &args.source_column)?;

    println!(
        "{} records ({} matched) from {}/{} batches in {:.1}s",
        result.records().len(),
        result.matched_count(),
        result.success_count(),
        result.total_batches(),
        result.execution_time().as_secs_f64(),
    );
    println!("[OK] {}", json_path.display());
    println!("[OK] {}", csv_path.display());

    if !result.all_succeeded() {
        eprintln!("\n{} batch(es) failed:", result.failure_count());
        for failure in result.failures() {
            eprintln!("  {}", failure);
        }
    }
    Ok(())
}

async fn cmd_plan(args: PlanArgs, config: MatcherConfig) -> Result<()> {
    let target = read_column(&args.target, &args.target_column)
        .with_context(|| format!("reading target column from {}", args.target.display()))?;

    let batcher = Batcher::new(
        CharacterEstimator::with_ratio(args.chars_per_token)?,
        config.group_size,
        config.token_ceiling,
    )?;
    let batches = batcher.batch(&target, &args.target_column).await?;

    println!(
        "{} values -> {} batches (group size {}, ceiling {} tokens, estimate)",
        target.len(),
        batches.len(),
        config.group_size,
        config.token_ceiling
    );
    for b in &batches {
        let flag = if b.token_count > config.token_ceiling {
            "  over ceiling"
        } else {
            ""
        };
        println!(
            "  batch {:>3}: {:>4} values {:>6} tokens{}",
            b.index + 1,
            b.len(),
            b.token_count,
            flag
        );
    }
    if config.calls_per_minute > 0 {
        let minutes = batches.len().saturating_sub(1) / config.calls_per_minute as usize;
        println!(
            "at {} calls/min the run needs at least {} extra minute(s) of quota waits",
            config.calls_per_minute, minutes
        );
    }
    Ok(())
}
