//! Storage dispatch analysis (store and replica send paths)

use super::timed_lines;
use crate::commit::CommitSection;
use crate::patterns::PatternBank;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendKind {
    Store,
    Replica,
}

impl SendKind {
    pub fn marker(self) -> &'static str {
        match self {
            SendKind::Store => "store_send.go",
            SendKind::Replica => "replica_send.go",
        }
    }
}

/// A single slow send occurrence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SendEvent {
    pub node: u32,
    pub duration_ms: f64,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendAnalysis {
    pub kind: SendKind,
    /// Matching lines with a step time and node tag
    pub occurrences: usize,
    /// Longest occurrence above the threshold
    pub slowest: Option<SendEvent>,
}

/// Report the longest `kind` send step exceeding `threshold_ms`
pub fn analyze_send(
    patterns: &PatternBank,
    section: &CommitSection<'_>,
    kind: SendKind,
    threshold_ms: f64,
) -> SendAnalysis {
    let mut occurrences = 0;
    let mut slowest: Option<SendEvent> = None;

    for line in timed_lines(patterns, section) {
        if !line.text.contains(kind.marker()) {
            continue;
        }
        let (Some(duration_ms), Some(node)) = (line.step_ms, line.node) else {
            continue;
        };
        occurrences += 1;
        if duration_ms <= threshold_ms || slowest.is_some_and(|s| s.duration_ms >= duration_ms) {
            continue;
        }
        slowest = Some(SendEvent {
            node,
            duration_ms,
            line: line.number,
        });
    }

    SendAnalysis {
        kind,
        occurrences,
        slowest,
    }
}
