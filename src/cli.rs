//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// indicator-report - comparative reports over indicator time series
///
/// Aggregates achieved and target measurements per reference period for a
/// selection of indicators, prints a side-by-side report and optionally
/// hands it to an analysis service.
///
/// Examples:
///   indicator-report --data indicators.json --select 1,2
///   indicator-report --data indicators.json --all --format json -o report.json
///   indicator-report --source-url https://api.example.org --select 4,9 --prompt 12
///   indicator-report --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON dataset with `indicators` and `records` arrays
    #[arg(short, long, value_name = "FILE", conflicts_with = "source_url")]
    pub data: Option<PathBuf>,

    /// Base URL of a REST source exposing /indicators and /records
    #[arg(long, value_name = "URL")]
    pub source_url: Option<String>,

    /// Indicator ids to select, in order (comma-separated)
    ///
    /// Each id is toggled, so repeating an id removes it again.
    /// Example: --select 1,2,3
    #[arg(short, long, value_name = "IDS", value_delimiter = ',', conflicts_with = "all")]
    pub select: Option<Vec<String>>,

    /// Select every indicator the source lists
    #[arg(short, long)]
    pub all: bool,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Prompt id to run the comparative analysis with
    ///
    /// Without a prompt (here or in the config file) no analysis is run.
    #[arg(short, long, value_name = "ID")]
    pub prompt: Option<String>,

    /// Analysis service endpoint URL
    #[arg(long, value_name = "URL", env = "INDICATOR_REPORT_ANALYSIS_URL")]
    pub analysis_url: Option<String>,

    /// Bearer token sent to the source and the analysis service
    #[arg(long, value_name = "TOKEN", env = "INDICATOR_REPORT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Fail when an indicator has two values of the same kind for one period
    ///
    /// By default the later record wins.
    #[arg(long)]
    pub reject_duplicates: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .indicator-report.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Request timeout in seconds for the source and the analysis service
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Build and print the report without calling the analysis service
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .indicator-report.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The plain-text comparison sent to the analysis service (default)
    #[default]
    Text,
    /// Summaries, totals and text as JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.select.is_none() && !self.all {
            return Err("Choose indicators with --select or --all".to_string());
        }

        if let Some(ref ids) = self.select {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err("Indicator ids in --select must not be empty".to_string());
            }
        }

        if let Some(ref url) = self.source_url {
            if !is_http_url(url) {
                return Err("Source URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Not needed when no analysis will run
        if !self.dry_run {
            if let Some(ref url) = self.analysis_url {
                if !is_http_url(url) {
                    return Err("Analysis URL must start with 'http://' or 'https://'".to_string());
                }
            }
        }

        if let Some(ref prompt) = self.prompt {
            if prompt.trim().is_empty() {
                return Err("Prompt id must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the config file; `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
