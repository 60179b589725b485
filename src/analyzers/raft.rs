//! Consensus replication analysis
//!
//! Sums the step time of the five replication events per node and reports
//! the node with the largest total above the threshold.

use super::timed_lines;
use crate::commit::CommitSection;
use crate::patterns::PatternBank;
use serde::Serialize;
use std::collections::BTreeMap;

/// Replication events recognized in a commit section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RaftEventKind {
    ProposeSubmit,
    ProposeFlush,
    LocalProposal,
    ApplyCommand,
    LocalResult,
}

impl RaftEventKind {
    pub const ALL: [RaftEventKind; 5] = [
        RaftEventKind::ProposeSubmit,
        RaftEventKind::ProposeFlush,
        RaftEventKind::LocalProposal,
        RaftEventKind::ApplyCommand,
        RaftEventKind::LocalResult,
    ];

    /// Log text identifying this event
    pub fn marker(self) -> &'static str {
        match self {
            RaftEventKind::ProposeSubmit => "submitting proposal",
            RaftEventKind::ProposeFlush => "flushing proposal",
            RaftEventKind::LocalProposal => "evaluating local proposal",
            RaftEventKind::ApplyCommand => "applying command",
            RaftEventKind::LocalResult => "LocalResult",
        }
    }

    pub fn from_line(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| text.contains(kind.marker()))
    }
}

/// Node whose replication events took longest in total
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RaftNode {
    pub node: u32,
    pub total_ms: f64,
    pub events: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RaftAnalysis {
    /// Per-node totals, including nodes below the threshold
    pub per_node: BTreeMap<u32, RaftNode>,
    pub slowest: Option<RaftNode>,
}

/// Sum replication step times per node; report the largest total above `threshold_ms`
pub fn analyze_raft(
    patterns: &PatternBank,
    section: &CommitSection<'_>,
    threshold_ms: f64,
) -> RaftAnalysis {
    let mut per_node: BTreeMap<u32, RaftNode> = BTreeMap::new();

    for line in timed_lines(patterns, section) {
        let (Some(step_ms), Some(node)) = (line.step_ms, line.node) else {
            continue;
        };
        if RaftEventKind::from_line(line.text).is_none() {
            continue;
        }
        let entry = per_node.entry(node).or_insert(RaftNode {
            node,
            total_ms: 0.0,
            events: 0,
        });
        entry.total_ms += step_ms;
        entry.events += 1;
    }

    let slowest = per_node
        .values()
        .filter(|n| n.total_ms > threshold_ms)
        .fold(None, |best: Option<RaftNode>, n| match best {
            Some(b) if b.total_ms >= n.total_ms => Some(b),
            _ => Some(*n),
        });

    RaftAnalysis { per_node, slowest }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{lines, section};

    #[test]
    fn test_event_kind_from_line() {
        assert_eq!(
            RaftEventKind::from_line("event:[n1] submitting proposal to proposal buffer"),
            Some(RaftEventKind::ProposeSubmit)
        );
        assert_eq!(
            RaftEventKind::from_line("event:[n1] applying command"),
            Some(RaftEventKind::ApplyCommand)
        );
        assert_eq!(RaftEventKind::from_line("event:[n1] sending batch"), None);
    }

    #[test]
    fn test_sums_per_node() {
        let bank = PatternBank::new();
        let l = lines(&[
            "   10.000ms   12.000ms event:kv/kvserver/replica_proposal_buf.go:500 [n2,s2,r7/2] submitting proposal",
            "   25.000ms   15.000ms event:kv/kvserver/replica_proposal_buf.go:600 [n2,s2,r7/2] flushing proposal to Raft",
            "   40.000ms   15.000ms event:kv/kvserver/replica_application.go:100 [n2,s2,r7/2] applying command",
            "   42.000ms    2.000ms event:kv/kvserver/replica_proposal.go:80 [n3,s3,r7/3] LocalResult (reply: ...)",
            "   90.000ms   48.000ms event:kv/kvserver/replica_send.go:120 [n3,s3,r7/3] read-write path",
        ]);
        let analysis = analyze_raft(&bank, &section(&l), 40.0);
        assert_eq!(analysis.per_node.len(), 2);
        assert_eq!(analysis.per_node[&2].total_ms, 42.0);
        assert_eq!(analysis.per_node[&2].events, 3);
        assert_eq!(analysis.per_node[&3].total_ms, 2.0);
        let slowest = analysis.slowest.unwrap();
        assert_eq!(slowest.node, 2);
    }

    #[test]
    fn test_below_threshold_reports_nothing() {
        let bank = PatternBank::new();
        let l = lines(&["   10.000ms   40.000ms event:[n2] applying command"]);
        let analysis = analyze_raft(&bank, &section(&l), 40.0);
        assert_eq!(analysis.per_node[&2].total_ms, 40.0);
        assert!(analysis.slowest.is_none());
    }

    #[test]
    fn test_largest_of_several_qualifying_nodes() {
        let bank = PatternBank::new();
        let l = lines(&[
            "   10.000ms   45.000ms event:[n1] applying command",
            "   60.000ms   50.000ms event:[n4] applying command",
            "   99.000ms   39.000ms event:[n2] applying command",
        ]);
        let slowest = analyze_raft(&bank, &section(&l), 40.0).slowest.unwrap();
        assert_eq!(slowest.node, 4);
        assert_eq!(slowest.total_ms, 50.0);
    }

    #[test]
    fn test_lines_without_node_are_skipped() {
        let bank = PatternBank::new();
        let l = lines(&["   10.000ms   90.000ms event:applying command"]);
        assert!(analyze_raft(&bank, &section(&l), 40.0).per_node.is_empty());
    }
}
