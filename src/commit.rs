//! Commit phase extraction
//!
//! The commit section is the suffix of a trace beginning at the first line
//! carrying the commit marker. Its duration is the last leading elapsed
//! token minus the first one. Timestamps are assumed to increase through the
//! section; out-of-order timestamps produce a negative span, which is passed
//! through unchanged.

use crate::patterns::PatternBank;
use crate::segment::{LogLine, Trace};

/// Borrowed commit-phase slice of a trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitSection<'a> {
    /// Index of the commit marker line within the trace
    pub start: usize,
    pub lines: &'a [LogLine],
    /// Last minus first elapsed token (ms); `None` if no line carries one
    pub duration_ms: Option<f64>,
}

impl<'a> CommitSection<'a> {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

/// Locate the commit section of `trace`, `None` when the trace never commits
pub fn extract_commit<'a>(patterns: &PatternBank, trace: &'a Trace) -> Option<CommitSection<'a>> {
    let start = trace
        .lines
        .iter()
        .position(|line| patterns.is_commit_marker(&line.text))?;
    let lines = &trace.lines[start..];
    Some(CommitSection {
        start,
        lines,
        duration_ms: commit_duration(patterns, lines),
    })
}

/// Elapsed span between the first and last lines carrying a leading elapsed token
pub fn commit_duration(patterns: &PatternBank, lines: &[LogLine]) -> Option<f64> {
    let first = lines.iter().find_map(|l| patterns.elapsed(&l.text))?;
    let last = lines.iter().rev().find_map(|l| patterns.elapsed(&l.text))?;
    Some(last - first)
}
