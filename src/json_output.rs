//! JSON output format for ranked traces and classified commits
//!
//! `--format json` implementation

use crate::classify::{Category, ClassifiedTrace};
use crate::pipeline::{ClassificationReport, ExtractionReport};
use crate::rank::Ranked;
use crate::report::CategorySummary;
use crate::segment::{LogLine, Trace};
use serde::Serialize;

/// A single ranked record
#[derive(Debug, Clone, Serialize)]
pub struct JsonRecord {
    /// 1-based rank in the global ordering
    pub rank: usize,
    /// Source identifier (log file path)
    pub source: String,
    /// Line number of the threshold line
    pub first_line: usize,
    /// Trace duration from the threshold line (ms)
    pub trace_duration_ms: f64,
    /// Commit section duration (ms), classification only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_duration_ms: Option<f64>,
    /// Dominant commit step (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_step_ms: Option<f64>,
    /// Category and evidence, classification only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Category>,
    /// Raw lines, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LogLine>>,
}

/// Extraction totals
#[derive(Debug, Clone, Serialize)]
pub struct JsonExtractionSummary {
    pub sources_scanned: usize,
    pub empty_sources: usize,
    pub skipped_sources: usize,
    pub discarded: usize,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Format identifier
    pub format: String,
    /// `extract` or `classify`
    pub mode: String,
    pub records: Vec<JsonRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<JsonExtractionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<CategorySummary>,
}

impl JsonOutput {
    fn new(mode: &str) -> Self {
        Self {
            format: "txn-triage-json-v1".to_string(),
            mode: mode.to_string(),
            records: Vec::new(),
            extraction: None,
            classification: None,
        }
    }

    /// Build from an extraction report
    pub fn from_extraction(report: &ExtractionReport, include_lines: bool) -> Self {
        let mut output = Self::new("extract");
        output.records = report
            .traces
            .iter()
            .map(|t| trace_record(t, include_lines))
            .collect();
        output.extraction = Some(JsonExtractionSummary {
            sources_scanned: report.sources_scanned,
            empty_sources: report.empty_sources,
            skipped_sources: report.skipped_sources.len(),
            discarded: report.discarded,
        });
        output
    }

    /// Build from a classification report; `full_trace` selects the emitted lines
    pub fn from_classification(
        report: &ClassificationReport,
        include_lines: bool,
        full_trace: bool,
    ) -> Self {
        let mut output = Self::new("classify");
        output.records = report
            .records
            .iter()
            .map(|r| classified_record(r, include_lines, full_trace))
            .collect();
        output.classification = Some(CategorySummary::from_report(report));
        output
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn trace_record(ranked: &Ranked<Trace>, include_lines: bool) -> JsonRecord {
    let trace = &ranked.item;
    JsonRecord {
        rank: ranked.rank,
        source: trace.source.to_string(),
        first_line: trace.first_line().number,
        trace_duration_ms: trace.duration_ms,
        commit_duration_ms: None,
        longest_step_ms: None,
        classification: None,
        lines: include_lines.then(|| trace.lines.clone()),
    }
}

fn classified_record(
    ranked: &Ranked<ClassifiedTrace>,
    include_lines: bool,
    full_trace: bool,
) -> JsonRecord {
    let item = &ranked.item;
    JsonRecord {
        rank: ranked.rank,
        source: item.trace.source.to_string(),
        first_line: item.trace.first_line().number,
        trace_duration_ms: item.trace.duration_ms,
        commit_duration_ms: item.commit_duration_ms,
        longest_step_ms: item.longest_step.as_ref().map(|s| s.step_ms),
        classification: Some(item.category.clone()),
        lines: include_lines.then(|| item.emitted_lines(full_trace).to_vec()),
    }
}
