//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.indicator-report.toml` files.

use crate::analysis::{DuplicatePolicy, PeriodAggregator};
use crate::analyst::AnalystConfig;
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".indicator-report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Where indicators and records come from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Analysis service settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output file. Stdout when unset.
    #[serde(default)]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Indicator source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSON dataset file.
    #[serde(default)]
    pub path: Option<String>,

    /// REST source base URL, used when no dataset path is set.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token for the REST source.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            base_url: None,
            api_token: None,
            timeout_seconds: default_source_timeout(),
        }
    }
}

fn default_source_timeout() -> u64 {
    30
}

/// Analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Endpoint receiving `{prompt_id, text_to_analyze}`.
    #[serde(default = "default_analysis_url")]
    pub url: String,

    /// Prompt used when none is given on the command line.
    #[serde(default)]
    pub prompt_id: Option<String>,

    /// Bearer token for the analysis service.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_analysis_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            url: default_analysis_url(),
            prompt_id: None,
            api_token: None,
            timeout_seconds: default_analysis_timeout(),
        }
    }
}

fn default_analysis_url() -> String {
    AnalystConfig::default().endpoint_url
}

fn default_analysis_timeout() -> u64 {
    300 // completions over long reports are slow
}

/// Aggregation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Same-kind records sharing a period: `last-write-wins` or `reject`.
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Print the per-indicator overview when the report goes to a file.
    #[serde(default = "default_true")]
    pub include_overview: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_overview: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // A source given on the command line replaces both configured sources
        if let Some(ref data) = args.data {
            self.source.path = Some(data.display().to_string());
            self.source.base_url = None;
        } else if let Some(ref url) = args.source_url {
            self.source.path = None;
            self.source.base_url = Some(url.clone());
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(ref url) = args.analysis_url {
            self.analysis.url = url.clone();
        }
        if let Some(ref prompt) = args.prompt {
            self.analysis.prompt_id = Some(prompt.trim().to_string());
        }
        if let Some(ref token) = args.token {
            self.source.api_token = Some(token.clone());
            self.analysis.api_token = Some(token.clone());
        }

        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
            self.analysis.timeout_seconds = timeout;
        }

        if args.reject_duplicates {
            self.aggregation.duplicates = DuplicatePolicy::Reject;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Aggregator configured with the duplicate policy.
    pub fn aggregator(&self) -> PeriodAggregator {
        PeriodAggregator::new(self.aggregation.duplicates)
    }

    /// Settings for the HTTP analysis client.
    pub fn analyst_config(&self) -> AnalystConfig {
        AnalystConfig {
            endpoint_url: self.analysis.url.clone(),
            api_token: self.analysis.api_token.clone(),
            timeout_seconds: self.analysis.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.format, OutputFormat::Text);
        assert!(config.general.output.is_none());
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.analysis.timeout_seconds, 300);
        assert_eq!(config.aggregation.duplicates, DuplicatePolicy::LastWriteWins);
        assert!(config.report.include_overview);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "comparison.txt"
format = "json"

[source]
base_url = "https://indicators.example.org/api"
timeout_seconds = 10

[analysis]
prompt_id = "12"

[aggregation]
duplicates = "reject"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("comparison.txt"));
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(
            config.source.base_url.as_deref(),
            Some("https://indicators.example.org/api")
        );
        assert_eq!(config.source.timeout_seconds, 10);
        assert_eq!(config.analysis.prompt_id.as_deref(), Some("12"));
        assert_eq!(config.analysis.url, default_analysis_url());
        assert_eq!(config.aggregation.duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[aggregation]\nduplicates = \"first-wins\"\n")
            .unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str(
            r#"
[source]
path = "configured.json"

[analysis]
prompt_id = "1"
"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "indicator-report",
            "--source-url",
            "http://localhost:8080",
            "--select",
            "1,2",
            "--prompt",
            "9",
            "--timeout",
            "5",
            "--reject-duplicates",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert!(config.source.path.is_none());
        assert_eq!(config.source.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.analysis.prompt_id.as_deref(), Some("9"));
        assert_eq!(config.source.timeout_seconds, 5);
        assert_eq!(config.analyst_config().timeout_seconds, 5);
        assert_eq!(config.aggregation.duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_file_verbose_survives_merge() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args =
            Args::try_parse_from(["indicator-report", "--data", "x.json", "--all"]).unwrap();
        config.merge_with_args(&args);

        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("duplicates = \"last-write-wins\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.report.include_overview);
    }
}
