//! perfherder-charts CLI - Chart datasets from Treeherder performance data

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use perfherder_charts_core::{ChartSpec, SeriesConfig, SeriesOptions, SeriesRequest, Settings};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

mod error;
mod pipeline;
mod treeherder;
mod validation;

use pipeline::Pipeline;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// perfherder-charts: Chart datasets from Treeherder performance data
#[derive(Parser, Debug)]
#[command(name = "perfherder-charts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON settings file; missing fields keep their defaults
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[arg(long, global = true, env = "TREEHERDER_URL")]
    treeherder_url: Option<String>,

    #[arg(long, global = true, env = "PERFHERDER_REPO")]
    repo: Option<String>,

    /// Days after which the newest point of a series counts as stale
    #[arg(long, global = true)]
    freshness_days: Option<i64>,

    /// Time range of fetched data, in days
    #[arg(long, global = true)]
    interval_days: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the parent signature of a series
    Resolve(SeriesArgs),
    /// Print the parent signature with its subtests
    Subtests(SubtestsArgs),
    /// Build the chart dataset of one series request
    Chart(ChartArgs),
    /// Build every chart of a dashboard definition file
    Dashboard(DashboardArgs),
}

#[derive(Args, Debug)]
struct SeriesArgs {
    #[arg(short, long)]
    suite: String,

    #[arg(short, long)]
    platform: String,

    #[arg(short, long, default_value = "1")]
    framework: u32,

    #[arg(short, long, default_value = "opt")]
    option: String,
}

impl SeriesArgs {
    fn config(&self, test: Option<String>) -> SeriesConfig {
        SeriesConfig {
            suite: self.suite.clone(),
            platform: self.platform.clone(),
            framework: self.framework,
            option: self.option.clone(),
            test,
        }
    }
}

#[derive(Args, Debug)]
struct SubtestsArgs {
    #[command(flatten)]
    series: SeriesArgs,

    /// Leave the parent signature out
    #[arg(long, default_value = "false")]
    no_parent: bool,
}

#[derive(Args, Debug)]
struct ChartArgs {
    #[command(flatten)]
    series: SeriesArgs,

    /// Restrict the chart to a single subtest
    #[arg(short, long)]
    test: Option<String>,

    #[arg(short, long)]
    label: Option<String>,

    /// Draw every subtest as its own line
    #[arg(long, default_value = "false")]
    include_subtests: bool,

    /// Leave the parent signature out
    #[arg(long, default_value = "false")]
    no_parent: bool,

    /// Drop points at or above this percentile
    #[arg(long, default_value = "100")]
    percentile: f64,
}

#[derive(Args, Debug)]
struct DashboardArgs {
    /// JSON file with `[{title, series: [...]}]`
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let settings = load_settings(&cli)?;
    let pipeline = Pipeline::new(settings).context("Failed to set up the Treeherder client")?;
    debug!(
        "Using {} ({}), {} day window",
        pipeline.settings().base_url(),
        pipeline.settings().repo,
        pipeline.settings().interval_secs / SECS_PER_DAY
    );

    match cli.command {
        Commands::Resolve(args) => resolve_command(&pipeline, args).await,
        Commands::Subtests(args) => subtests_command(&pipeline, args).await,
        Commands::Chart(args) => chart_command(&pipeline, args).await,
        Commands::Dashboard(args) => dashboard_command(&pipeline, args).await,
    }
}

/// Settings file first, then command line and environment overrides
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => {
            validation::validate_file_exists(path, "Settings file")?;
            Settings::load_from_file(path)
                .with_context(|| format!("Failed to load settings from {:?}", path))?
        }
        None => Settings::new(),
    };

    if let Some(url) = &cli.treeherder_url {
        settings.treeherder_url = url.clone();
    }
    if let Some(repo) = &cli.repo {
        settings.repo = repo.clone();
    }
    if let Some(days) = cli.freshness_days {
        validation::validate_freshness_days(days)?;
        settings.freshness_days = days;
    }
    if let Some(days) = cli.interval_days {
        validation::validate_interval_days(days)?;
        settings.interval_secs = days * SECS_PER_DAY;
    }

    validation::validate_base_url(&settings.treeherder_url)?;
    validation::validate_palette(&settings.palette)?;
    Ok(settings)
}

async fn resolve_command(pipeline: &Pipeline, args: SeriesArgs) -> Result<()> {
    let config = args.config(None);
    validation::validate_series_config(&config)?;

    let parent = pipeline
        .resolve_parent(&config)
        .await
        .with_context(|| format!("Failed to resolve signature for {}", config))?;

    info!("Resolved signature {} ({})", parent.id, parent.hash);
    print_json(&parent)
}

async fn subtests_command(pipeline: &Pipeline, args: SubtestsArgs) -> Result<()> {
    let config = args.series.config(None);
    validation::validate_series_config(&config)?;

    let parent = pipeline
        .resolve_parent(&config)
        .await
        .with_context(|| format!("Failed to resolve signature for {}", config))?;
    let signatures = pipeline
        .resolve_subtests(&parent, !args.no_parent)
        .await
        .with_context(|| format!("Failed to fetch subtests of {}", parent.hash))?;

    info!("Found {} signatures", signatures.len());
    let signatures: Vec<_> = signatures.iter().collect();
    print_json(&signatures)
}

async fn chart_command(pipeline: &Pipeline, args: ChartArgs) -> Result<()> {
    let config = args.series.config(args.test);
    validation::validate_series_config(&config)?;
    validation::validate_percentile(args.percentile)?;

    let request = SeriesRequest {
        label: args.label,
        config,
        options: SeriesOptions {
            include_subtests: args.include_subtests,
            include_parent_data: !args.no_parent,
            percentile_threshold: args.percentile,
        },
    };

    let chart = pipeline
        .chart(std::slice::from_ref(&request))
        .await
        .with_context(|| format!("Failed to build chart for {}", request.config))?;

    for warning in &chart.warnings {
        warn!("{}", warning.message());
    }
    print_json(&chart)
}

async fn dashboard_command(pipeline: &Pipeline, args: DashboardArgs) -> Result<()> {
    validation::validate_file_exists(&args.file, "Dashboard file")?;
    let charts = ChartSpec::load_all(&args.file)
        .with_context(|| format!("Failed to load dashboard from {:?}", args.file))?;

    for spec in &charts {
        for request in &spec.series {
            validation::validate_series_config(&request.config)
                .with_context(|| format!("Invalid series in chart '{}'", spec.title))?;
            validation::validate_percentile(request.options.percentile_threshold)
                .with_context(|| format!("Invalid series in chart '{}'", spec.title))?;
        }
    }

    info!("Building {} charts", charts.len());
    let panels = pipeline.dashboard(&charts).await;

    let failed = panels.iter().filter(|p| p.error.is_some()).count();
    if failed > 0 {
        warn!("{} of {} charts failed", failed, panels.len());
    }
    print_json(&panels)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
