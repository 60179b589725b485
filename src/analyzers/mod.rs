//! Specialized latency analyzers for commit sections
//!
//! Each analyzer is a pure function of a commit section and its threshold.
//! They only read the section, so they can run in any order.

pub mod network;
pub mod raft;
pub mod send;

pub use network::{analyze_network, NetworkAnalysis, NetworkDiscrepancy, NetworkHop};
pub use raft::{analyze_raft, RaftAnalysis, RaftEventKind, RaftNode};
pub use send::{analyze_send, SendAnalysis, SendEvent, SendKind};

use crate::commit::CommitSection;
use crate::patterns::PatternBank;

/// A section line with its leading timestamps and node tag resolved
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedLine<'a> {
    pub index: usize,
    pub number: usize,
    pub cumulative_ms: f64,
    pub step_ms: Option<f64>,
    pub node: Option<u32>,
    pub text: &'a str,
}

/// Resolve every line that carries at least a leading elapsed token
pub(crate) fn timed_lines<'a>(
    patterns: &PatternBank,
    section: &CommitSection<'a>,
) -> Vec<TimedLine<'a>> {
    section
        .lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| {
            let (cumulative_ms, step_ms) = match patterns.dual_elapsed(&line.text) {
                Some((cumulative, step)) => (cumulative, Some(step)),
                None => (patterns.elapsed(&line.text)?, None),
            };
            Some(TimedLine {
                index,
                number: line.number,
                cumulative_ms,
                step_ms,
                node: patterns.node_id(&line.text),
                text: line.text.as_str(),
            })
        })
        .collect()
}
