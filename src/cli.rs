//! CLI argument parsing for txn-triage

use crate::config::TriageConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Output format for the stdout listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "txn-triage")]
#[command(version)]
#[command(about = "Extract slow transaction traces from debug bundles and classify commit latency", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract slow transaction traces ranked by trace duration
    Extract(ExtractArgs),
    /// Extract commit phases and classify their dominant latency cause
    Classify(ClassifyArgs),
}

/// Options shared by both subcommands
#[derive(Args, Debug)]
pub struct BundleArgs {
    /// Path to the unpacked debug bundle (contains nodes/<id>/logs/)
    #[arg(short = 'd', long = "debug-zip", value_name = "DIR")]
    pub debug_zip: PathBuf,

    /// Output directory; deleted and recreated, refused if it holds unrelated files
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Minimum trace duration in milliseconds [default: 200]
    #[arg(short = 't', long = "threshold", value_name = "MS")]
    pub threshold: Option<f64>,

    /// Regex a trace must match; empty string disables [default: 'portal resolved to.*COMMIT']
    #[arg(short = 'f', long = "filter", value_name = "REGEX")]
    pub filter: Option<String>,

    /// TOML configuration file; flags override its values
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Include raw lines in JSON output
    #[arg(long = "with-lines")]
    pub with_lines: bool,

    /// Worker threads for reading log files [default: available parallelism]
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Print results without writing the output directory
    #[arg(long = "no-write")]
    pub no_write: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    /// Minimum COMMIT duration in milliseconds [default: 50]
    #[arg(long = "min-duration", value_name = "MS")]
    pub min_duration: Option<f64>,

    /// Maximum COMMIT duration in milliseconds (150 when given without a value)
    #[arg(
        long = "max-duration",
        value_name = "MS",
        num_args = 0..=1,
        default_missing_value = "150"
    )]
    pub max_duration: Option<f64>,

    /// Network latency threshold in milliseconds [default: 50]
    #[arg(long = "network-threshold", value_name = "MS")]
    pub network_threshold: Option<f64>,

    /// Client/server latency discrepancy flagged as abnormal, in milliseconds [default: 5]
    #[arg(long = "abnormal-threshold", value_name = "MS")]
    pub abnormal_threshold: Option<f64>,

    /// Per-node Raft replication threshold in milliseconds [default: 40]
    #[arg(long = "raft-threshold", value_name = "MS")]
    pub raft_threshold: Option<f64>,

    /// Store send threshold in milliseconds [default: 10]
    #[arg(long = "store-send-threshold", value_name = "MS")]
    pub store_send_threshold: Option<f64>,

    /// Replica send threshold in milliseconds [default: 10]
    #[arg(long = "replica-send-threshold", value_name = "MS")]
    pub replica_send_threshold: Option<f64>,

    /// Write the full trace instead of only the COMMIT section
    #[arg(long = "full-trace")]
    pub full_trace: bool,
}

impl BundleArgs {
    /// Apply shared overrides on top of `config`
    pub fn apply(&self, config: &mut TriageConfig) {
        if let Some(ms) = self.threshold {
            config.min_trace_ms = ms;
        }
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
    }

    /// Output directory, defaulting to `bin/<bundle name>/<leaf>`
    pub fn output_dir(&self, leaf: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_dir(&self.debug_zip, leaf))
    }
}

impl ClassifyArgs {
    /// Apply classification overrides on top of `config`
    pub fn apply(&self, config: &mut TriageConfig) {
        self.bundle.apply(config);
        if let Some(ms) = self.min_duration {
            config.min_commit_ms = ms;
        }
        if let Some(ms) = self.max_duration {
            config.max_commit_ms = Some(ms);
        }
        let thresholds = &mut config.thresholds;
        if let Some(ms) = self.network_threshold {
            thresholds.network_ms = ms;
        }
        if let Some(ms) = self.abnormal_threshold {
            thresholds.abnormal_ms = ms;
        }
        if let Some(ms) = self.raft_threshold {
            thresholds.raft_ms = ms;
        }
        if let Some(ms) = self.store_send_threshold {
            thresholds.store_send_ms = ms;
        }
        if let Some(ms) = self.replica_send_threshold {
            thresholds.replica_send_ms = ms;
        }
    }
}

fn default_output_dir(bundle: &Path, leaf: &str) -> PathBuf {
    let name = bundle
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    PathBuf::from("bin").join(name).join(leaf)
}
