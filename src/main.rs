//! indicator-report - comparative indicator analysis from the command line
//!
//! Builds the side-by-side achieved/target report for a selection of
//! indicators and optionally sends it to the analysis service.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, malformed data, etc.)
//!   2 - Analysis refused because fewer than two indicators are selected

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use indicator_report::analyst::HttpAnalyst;
use indicator_report::cli::{Args, OutputFormat};
use indicator_report::config::{Config, DEFAULT_CONFIG_FILE};
use indicator_report::report::{generate_json_report, generate_overview};
use indicator_report::source::{FileSource, HttpSource, IndicatorSource};
use indicator_report::{AnalysisSession, EngineError, IndicatorId, SelectionSet, SessionError};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging so `[general] verbose` can raise the level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose))?;

    info!("indicator-report v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .indicator-report.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the data source, analysis service and prompt.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Build the report and run the analysis. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let source = build_source(&config)?;
    let selection = build_selection(&args, source.as_ref()).await?;
    info!("Selected {} indicator(s)", selection.len());

    let mut session = AnalysisSession::new(config.aggregator());
    session.selection_changed(&selection);

    // Step 1: Fetch and aggregate
    let fetch_progress = spinner(&args, "Fetching indicator data...");
    let fetched = session.refresh(&selection, source.as_ref()).await;
    fetch_progress.finish_and_clear();
    fetched.context("Failed to build the comparison report")?;

    let report = session
        .report()
        .context("No report was produced for the selection")?;

    for id in &report.missing {
        warn!("No dated records for indicator {}", id);
    }

    // Step 2: Write the report
    let content = match config.general.format {
        OutputFormat::Text => report.text.clone(),
        OutputFormat::Json => {
            generate_json_report(report).context("Failed to serialize report")?
        }
    };

    match config.general.output {
        Some(ref output) => {
            std::fs::write(output, &content)
                .with_context(|| format!("Failed to write report to {}", output))?;
            if !args.quiet {
                if config.report.include_overview {
                    println!("{}", generate_overview(report));
                }
                println!("📄 Report saved to: {}", output);
            }
        }
        None => print!("{}", content),
    }

    debug!("Report built in {:.2}s", start_time.elapsed().as_secs_f64());

    if args.dry_run {
        if !args.quiet {
            eprintln!("✅ Dry run complete. The analysis service was not called.");
        }
        return Ok(0);
    }

    // Step 3: Optional analysis
    let prompt_id = match config.analysis.prompt_id {
        Some(ref prompt_id) => prompt_id.clone(),
        None => {
            debug!("No prompt configured, skipping analysis");
            return Ok(0);
        }
    };

    let analyst = HttpAnalyst::new(config.analyst_config())?;

    let analysis_progress = spinner(&args, "Running comparative analysis...");
    let analyzed = session.run_analysis(&selection, &prompt_id, &analyst).await;
    analysis_progress.finish_and_clear();

    match analyzed {
        Ok(outcome) => {
            if !args.quiet {
                eprintln!(
                    "🔬 Analysis of {} indicators (prompt {}):\n",
                    outcome.indicator_ids.len(),
                    outcome.prompt_id
                );
            }
            println!("{}", outcome.result);
            info!("Completed in {:.2}s", start_time.elapsed().as_secs_f64());
            Ok(0)
        }
        Err(EngineError::Rejected(e @ SessionError::InsufficientSelection { .. })) => {
            eprintln!("\n⛔ {}", e);
            Ok(2)
        }
        Err(e) => Err(e).context("Comparative analysis failed"),
    }
}

/// Pick the dataset file or the REST source.
fn build_source(config: &Config) -> Result<Box<dyn IndicatorSource>> {
    if let Some(ref path) = config.source.path {
        info!("Using dataset: {}", path);
        let source = FileSource::load(Path::new(path))
            .with_context(|| format!("Failed to load dataset {}", path))?;
        return Ok(Box::new(source));
    }

    if let Some(ref base_url) = config.source.base_url {
        info!("Using REST source: {}", base_url);
        let source = HttpSource::new(
            base_url,
            config.source.api_token.clone(),
            config.source.timeout_seconds,
        )?;
        return Ok(Box::new(source));
    }

    anyhow::bail!("No data source configured; pass --data or --source-url")
}

/// Apply --select toggles or --all to an empty selection.
async fn build_selection(args: &Args, source: &dyn IndicatorSource) -> Result<SelectionSet> {
    let mut selection = SelectionSet::new();

    if args.all {
        let visible = source
            .list_indicators()
            .await
            .context("Failed to list indicators")?;
        selection.select_all_visible(visible.into_iter().map(|indicator| indicator.id));
    }

    if let Some(ref ids) = args.select {
        for id in ids {
            selection.toggle(IndicatorId::from(id.as_str()));
        }
    }

    Ok(selection)
}

/// Spinner for long collaborator calls; hidden in quiet mode.
fn spinner(args: &Args, message: &str) -> ProgressBar {
    if args.quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is installed, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}", DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
