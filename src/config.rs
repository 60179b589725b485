//! Triage configuration
//!
//! Values come from built-in defaults, an optional TOML file, and finally
//! command-line overrides.
//!
//! ```toml
//! min_trace_ms = 250.0
//! min_commit_ms = 50.0
//! max_commit_ms = 150.0
//! ignore_patterns = ["acquiring latches"]
//!
//! [thresholds]
//! network_ms = 40.0
//! raft_ms = 40.0
//! ```

use crate::error::TriageError;
use crate::patterns::{IgnoreList, TraceFilter, DEFAULT_FILTER};
use crate::rank::CommitFilter;
use crate::segment::SegmentConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound used when the commit cap is requested without a value
pub const DEFAULT_MAX_COMMIT_MS: f64 = 150.0;

/// Per-analyzer classification thresholds (ms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    #[serde(default = "default_network_ms")]
    pub network_ms: f64,
    /// Client→server vs server→client difference flagged as abnormal
    #[serde(default = "default_abnormal_ms")]
    pub abnormal_ms: f64,
    #[serde(default = "default_raft_ms")]
    pub raft_ms: f64,
    #[serde(default = "default_send_ms")]
    pub store_send_ms: f64,
    #[serde(default = "default_send_ms")]
    pub replica_send_ms: f64,
}

fn default_network_ms() -> f64 {
    50.0
}

fn default_abnormal_ms() -> f64 {
    5.0
}

fn default_raft_ms() -> f64 {
    40.0
}

fn default_send_ms() -> f64 {
    10.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            network_ms: default_network_ms(),
            abnormal_ms: default_abnormal_ms(),
            raft_ms: default_raft_ms(),
            store_send_ms: default_send_ms(),
            replica_send_ms: default_send_ms(),
        }
    }
}

/// Full configuration for a triage run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Minimum trace duration kept by segmentation
    #[serde(default = "default_min_trace_ms")]
    pub min_trace_ms: f64,

    /// Regex the trace text must match; empty disables filtering
    #[serde(default = "default_filter")]
    pub filter: Option<String>,

    /// Minimum commit duration kept by classification
    #[serde(default = "default_min_commit_ms")]
    pub min_commit_ms: f64,

    /// Optional commit duration cap
    pub max_commit_ms: Option<f64>,

    pub thresholds: Thresholds,

    /// Extra timing lines to exclude from dominant-step selection
    pub ignore_patterns: Vec<String>,
}

fn default_min_trace_ms() -> f64 {
    200.0
}

fn default_filter() -> Option<String> {
    Some(DEFAULT_FILTER.to_string())
}

fn default_min_commit_ms() -> f64 {
    50.0
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            min_trace_ms: default_min_trace_ms(),
            filter: default_filter(),
            min_commit_ms: default_min_commit_ms(),
            max_commit_ms: None,
            thresholds: Thresholds::default(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl TriageConfig {
    /// Load a TOML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, TriageError> {
        let text = std::fs::read_to_string(path).map_err(|source| TriageError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, TriageError> {
        Ok(toml::from_str(text)?)
    }

    /// Compile the segmentation settings; fails on an invalid filter
    pub fn segment_config(&self) -> Result<SegmentConfig, TriageError> {
        Ok(SegmentConfig {
            min_threshold_ms: self.min_trace_ms,
            filter: TraceFilter::optional(self.filter.as_deref())?,
        })
    }

    pub fn ignore_list(&self) -> Result<IgnoreList, TriageError> {
        IgnoreList::with_extra(&self.ignore_patterns)
    }

    pub fn commit_filter(&self) -> CommitFilter {
        CommitFilter {
            min_ms: self.min_commit_ms,
            max_ms: self.max_commit_ms,
        }
    }
}
