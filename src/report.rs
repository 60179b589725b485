//! Output directory writer and human-readable summaries
//!
//! Extraction writes `trace_NNNN.txt` files named by rank. Classification
//! writes one file per commit under its category directory plus a
//! `summary.json` with per-category counts.

use crate::classify::{CategoryKind, ClassifiedTrace};
use crate::error::TriageError;
use crate::pipeline::{ClassificationReport, ExtractionReport};
use crate::rank::Ranked;
use crate::segment::{join_lines, Trace};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the summary file written next to the category directories
pub const SUMMARY_FILE: &str = "summary.json";

/// Count and share of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: CategoryKind,
    pub count: usize,
    pub percent: f64,
}

/// Per-category statistics for a classification run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub total: usize,
    pub traces_found: usize,
    pub no_commit: usize,
    pub filtered: usize,
    pub skipped_sources: usize,
    pub categories: Vec<CategoryCount>,
}

impl CategorySummary {
    pub fn from_report(report: &ClassificationReport) -> Self {
        let total = report.records.len();
        let categories = report
            .counts()
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category,
                count,
                percent: percent(count, total),
            })
            .collect();
        Self {
            total,
            traces_found: report.traces_found,
            no_commit: report.no_commit,
            filtered: report.filtered,
            skipped_sources: report.skipped_sources.len(),
            categories,
        }
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Clear and recreate `dir`
///
/// An existing non-empty directory is only removed when it holds output of
/// an earlier run, as recognised by `is_artifact` on its entry names.
fn reset_dir(dir: &Path, is_artifact: fn(&str) -> bool) -> Result<(), TriageError> {
    if dir.exists() {
        let mut entries = fs::read_dir(dir)?.peekable();
        let empty = entries.peek().is_none();
        let mut recognised = false;
        for entry in entries {
            if is_artifact(&entry?.file_name().to_string_lossy()) {
                recognised = true;
                break;
            }
        }
        if !empty && !recognised {
            return Err(TriageError::ForeignOutputDir(dir.to_path_buf()));
        }
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

fn is_trace_file(name: &str) -> bool {
    name.strip_prefix("trace_")
        .and_then(|rest| rest.strip_suffix(".txt"))
        .is_some_and(|rank| !rank.is_empty() && rank.bytes().all(|b| b.is_ascii_digit()))
}

fn is_classification_entry(name: &str) -> bool {
    name == SUMMARY_FILE
        || CategoryKind::ALL.iter().any(|kind| {
            kind.dir()
                .components()
                .next()
                .is_some_and(|top| top.as_os_str() == name)
        })
}

/// File name for an extracted trace (`trace_0001.txt`)
pub fn trace_file_name(rank: usize) -> String {
    format!("trace_{:04}.txt", rank)
}

/// Write ranked traces into a freshly cleared `out_dir`
pub fn write_traces(out_dir: &Path, traces: &[Ranked<Trace>]) -> Result<Vec<PathBuf>, TriageError> {
    reset_dir(out_dir, is_trace_file)?;
    let mut written = Vec::with_capacity(traces.len());
    for ranked in traces {
        let path = out_dir.join(trace_file_name(ranked.rank));
        let mut text = ranked.item.text();
        text.push('\n');
        fs::write(&path, text)?;
        written.push(path);
    }
    Ok(written)
}

fn source_stem(source: &str) -> String {
    Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string())
}

/// File name for a classified commit (`<rank>_<source stem>_L<first line>.txt`)
pub fn record_file_name(record: &Ranked<ClassifiedTrace>) -> String {
    let trace = &record.item.trace;
    format!(
        "{}_{}_L{}.txt",
        record.rank,
        source_stem(&trace.source),
        trace.first_line().number
    )
}

/// Relative path of a classified commit inside the output directory
pub fn record_path(record: &Ranked<ClassifiedTrace>) -> PathBuf {
    record.item.category.dir().join(record_file_name(record))
}

/// Render a classified commit: header, the trace's first line, then the commit lines
pub fn render_record(record: &Ranked<ClassifiedTrace>, full_trace: bool) -> String {
    let item = &record.item;
    let mut out = String::new();

    match item.commit_duration_ms {
        Some(ms) => {
            let _ = writeln!(out, "COMMIT ran for a total of: {:.3} ms", ms);
        }
        None => out.push_str("COMMIT duration: Could not calculate\n"),
    }
    out.push('\n');

    if let Some(step) = &item.longest_step {
        let _ = writeln!(out, "Longest step: {:.3} ms", step.step_ms);
    }
    let _ = writeln!(out, "Category: {}", item.category.kind());
    if let Some(step) = &item.longest_step {
        let _ = writeln!(out, "Longest step details: {}", step.line);
    }
    if item.category.latency_ms().is_some() {
        let _ = writeln!(out, "Evidence: {}", item.category.describe());
    }
    let _ = writeln!(out, "Source: {}", item.trace.source);
    out.push('\n');

    out.push_str(&item.trace.first_line().text);
    out.push_str("\n\n");

    out.push_str(&join_lines(item.emitted_lines(full_trace)));
    out.push('\n');
    out
}

/// Write classified commits and `summary.json` into a freshly cleared `out_dir`
pub fn write_classified(
    out_dir: &Path,
    report: &ClassificationReport,
    full_trace: bool,
) -> Result<Vec<PathBuf>, TriageError> {
    reset_dir(out_dir, is_classification_entry)?;
    let mut written = Vec::with_capacity(report.records.len());
    for record in &report.records {
        let path = out_dir.join(record_path(record));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, render_record(record, full_trace))?;
        written.push(path);
    }

    let summary = CategorySummary::from_report(report);
    let json = serde_json::to_string_pretty(&summary).map_err(std::io::Error::other)?;
    fs::write(out_dir.join(SUMMARY_FILE), json)?;
    Ok(written)
}

/// Human-readable extraction summary
pub fn extraction_summary(report: &ExtractionReport, min_trace_ms: f64, out_dir: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scanned {} log files", report.sources_scanned);
    for (node, count) in &report.per_node {
        let _ = writeln!(out, "Node {}: found {} traces >= {}ms", node, count, min_trace_ms);
    }
    if report.traces.is_empty() {
        let _ = writeln!(out, "No traces found >= {}ms", min_trace_ms);
    } else {
        let _ = write!(out, "Extracted {} traces (>= {}ms)", report.traces.len(), min_trace_ms);
        if let Some(dir) = out_dir {
            let _ = write!(out, " to {}", dir.display());
        }
        out.push('\n');
    }
    if report.empty_sources > 0 {
        let _ = writeln!(out, "{} files: found with zero traces", report.empty_sources);
    }
    if !report.skipped_sources.is_empty() {
        let _ = writeln!(out, "Skipped {} unreadable files", report.skipped_sources.len());
    }
    out
}

/// Human-readable classification summary
pub fn classification_summary(summary: &CategorySummary, out_dir: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Classified {} commits", summary.total);
    for count in &summary.categories {
        let _ = writeln!(
            out,
            "  - {}: {} ({:.1}%)",
            count.category, count.count, count.percent
        );
    }
    let _ = writeln!(out, "No COMMIT section: {} traces", summary.no_commit);
    let _ = writeln!(out, "Filtered out by commit duration: {} traces", summary.filtered);
    if summary.skipped_sources > 0 {
        let _ = writeln!(out, "Skipped {} unreadable files", summary.skipped_sources);
    }
    if let Some(dir) = out_dir {
        let _ = writeln!(out, "Output directory: {}", dir.display());
    }
    out
}
