//! Root-cause classification of commit sections
//!
//! Classification is a fixed-priority chain evaluated top to bottom; the
//! first rule that fires decides the category:
//!
//! 1. QueryIntent: dominant step waited on the pre-commit QueryIntent batch
//! 2. Client→server network latency above the network threshold
//! 3. Server→client network latency above the network threshold
//! 4. Abnormal client→server / server→client discrepancy
//! 5. Raft: a node's cumulative replication time above the raft threshold
//! 6. StoreSend above its threshold
//! 7. ReplicaSend above its threshold
//! 8. Other
//!
//! Reordering [`RULES`] changes which bucket a trace lands in when several
//! signals co-occur.

use crate::analyzers::{
    analyze_network, analyze_raft, analyze_send, NetworkAnalysis, NetworkDiscrepancy, NetworkHop,
    RaftAnalysis, RaftNode, SendAnalysis, SendEvent, SendKind,
};
use crate::commit::{extract_commit, CommitSection};
use crate::config::Thresholds;
use crate::patterns::{IgnoreList, PatternBank};
use crate::rank::CommitFilter;
use crate::segment::{LogLine, Trace};
use crate::timing::analyze_timing;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Assigned root cause with its supporting evidence
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Category {
    QueryIntent { step_ms: f64 },
    NetworkClientServer(NetworkHop),
    NetworkServerClient(NetworkHop),
    NetworkAbnormal(NetworkDiscrepancy),
    Raft(RaftNode),
    StoreSend(SendEvent),
    ReplicaSend(SendEvent),
    Other,
}

/// Evidence-free category tag, used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    QueryIntent,
    NetworkClientServer,
    NetworkServerClient,
    NetworkAbnormal,
    Raft,
    StoreSend,
    ReplicaSend,
    Other,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 8] = [
        CategoryKind::QueryIntent,
        CategoryKind::NetworkClientServer,
        CategoryKind::NetworkServerClient,
        CategoryKind::NetworkAbnormal,
        CategoryKind::Raft,
        CategoryKind::StoreSend,
        CategoryKind::ReplicaSend,
        CategoryKind::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoryKind::QueryIntent => "query_intent",
            CategoryKind::NetworkClientServer => "network_client_server",
            CategoryKind::NetworkServerClient => "network_server_client",
            CategoryKind::NetworkAbnormal => "network_abnormal",
            CategoryKind::Raft => "raft",
            CategoryKind::StoreSend => "store_send",
            CategoryKind::ReplicaSend => "replica_send",
            CategoryKind::Other => "other",
        }
    }

    /// Output directory for this category, before any node subdirectory
    pub fn dir(self) -> PathBuf {
        match self {
            CategoryKind::NetworkClientServer => PathBuf::from("network").join("client_server"),
            CategoryKind::NetworkServerClient => PathBuf::from("network").join("server_client"),
            CategoryKind::NetworkAbnormal => PathBuf::from("network").join("abnormal"),
            other => PathBuf::from(other.name()),
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn node_label(node: Option<u32>) -> String {
    node.map_or_else(|| "unknown".to_string(), |n| n.to_string())
}

impl Category {
    pub fn kind(&self) -> CategoryKind {
        match self {
            Category::QueryIntent { .. } => CategoryKind::QueryIntent,
            Category::NetworkClientServer(_) => CategoryKind::NetworkClientServer,
            Category::NetworkServerClient(_) => CategoryKind::NetworkServerClient,
            Category::NetworkAbnormal(_) => CategoryKind::NetworkAbnormal,
            Category::Raft(_) => CategoryKind::Raft,
            Category::StoreSend(_) => CategoryKind::StoreSend,
            Category::ReplicaSend(_) => CategoryKind::ReplicaSend,
            Category::Other => CategoryKind::Other,
        }
    }

    /// Node the evidence points at (the server side for network categories)
    pub fn node(&self) -> Option<u32> {
        match self {
            Category::NetworkClientServer(hop) | Category::NetworkServerClient(hop) => {
                hop.server_node
            }
            Category::NetworkAbnormal(d) => d.server_node,
            Category::Raft(r) => Some(r.node),
            Category::StoreSend(s) | Category::ReplicaSend(s) => Some(s.node),
            Category::QueryIntent { .. } | Category::Other => None,
        }
    }

    /// Headline latency of the evidence (ms)
    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            Category::QueryIntent { step_ms } => Some(*step_ms),
            Category::NetworkClientServer(hop) | Category::NetworkServerClient(hop) => {
                Some(hop.latency_ms)
            }
            Category::NetworkAbnormal(d) => Some(d.discrepancy_ms),
            Category::Raft(r) => Some(r.total_ms),
            Category::StoreSend(s) | Category::ReplicaSend(s) => Some(s.duration_ms),
            Category::Other => None,
        }
    }

    /// Relative output directory, with a node subdirectory where evidence names one
    pub fn dir(&self) -> PathBuf {
        let base = self.kind().dir();
        match self {
            Category::QueryIntent { .. } | Category::Other => base,
            Category::NetworkClientServer(hop) | Category::NetworkServerClient(hop) => {
                base.join(node_label(hop.server_node))
            }
            Category::NetworkAbnormal(d) => base.join(node_label(d.server_node)),
            _ => base.join(node_label(self.node())),
        }
    }

    /// One-line human description of the evidence
    pub fn describe(&self) -> String {
        match self {
            Category::QueryIntent { step_ms } => {
                format!("QueryIntent batch response wait: {:.3} ms", step_ms)
            }
            Category::NetworkClientServer(hop) => format!(
                "Network client->server: {:.3} ms from node {} to node {} (lines {}->{})",
                hop.latency_ms,
                node_label(hop.client_node),
                node_label(hop.server_node),
                hop.from_line,
                hop.to_line
            ),
            Category::NetworkServerClient(hop) => format!(
                "Network server->client: {:.3} ms from node {} to node {} (lines {}->{})",
                hop.latency_ms,
                node_label(hop.server_node),
                node_label(hop.client_node),
                hop.from_line,
                hop.to_line
            ),
            Category::NetworkAbnormal(d) => format!(
                "Network discrepancy: {:.3} ms between client node {} and server node {} (client->server {:.3} ms, server->client {:.3} ms)",
                d.discrepancy_ms,
                node_label(d.client_node),
                node_label(d.server_node),
                d.client_server_ms,
                d.server_client_ms
            ),
            Category::Raft(r) => format!(
                "Raft replication: {:.3} ms across {} events on node {}",
                r.total_ms, r.events, r.node
            ),
            Category::StoreSend(s) => format!(
                "Store send: {:.3} ms on node {} (line {})",
                s.duration_ms, s.node, s.line
            ),
            Category::ReplicaSend(s) => format!(
                "Replica send: {:.3} ms on node {} (line {})",
                s.duration_ms, s.node, s.line
            ),
            Category::Other => "No dominant latency signal".to_string(),
        }
    }
}

/// Analyzer outputs for one commit section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signals {
    /// Dominant step, when the section has timing lines
    pub longest_step: Option<LongestStep>,
    pub query_intent: bool,
    pub network: NetworkAnalysis,
    pub raft: RaftAnalysis,
    pub store_send: SendAnalysis,
    pub replica_send: SendAnalysis,
}

impl Signals {
    /// Run every analyzer over `section`
    pub fn gather(
        patterns: &PatternBank,
        ignore: &IgnoreList,
        section: &CommitSection<'_>,
        thresholds: &Thresholds,
    ) -> Self {
        let timing = analyze_timing(patterns, ignore, section);
        Self {
            longest_step: timing.as_ref().map(|t| LongestStep {
                step_ms: t.dominant.step_ms,
                line: t.dominant.line.trim().to_string(),
            }),
            query_intent: timing.as_ref().is_some_and(|t| t.query_intent),
            network: analyze_network(patterns, section, thresholds.abnormal_ms),
            raft: analyze_raft(patterns, section, thresholds.raft_ms),
            store_send: analyze_send(patterns, section, SendKind::Store, thresholds.store_send_ms),
            replica_send: analyze_send(
                patterns,
                section,
                SendKind::Replica,
                thresholds.replica_send_ms,
            ),
        }
    }
}

/// A classification rule: fires with a category or passes
pub type Rule = fn(&Signals, &Thresholds) -> Option<Category>;

/// Classification rules in priority order
pub const RULES: &[(CategoryKind, Rule)] = &[
    (CategoryKind::QueryIntent, query_intent_rule),
    (CategoryKind::NetworkClientServer, client_server_rule),
    (CategoryKind::NetworkServerClient, server_client_rule),
    (CategoryKind::NetworkAbnormal, abnormal_rule),
    (CategoryKind::Raft, raft_rule),
    (CategoryKind::StoreSend, store_send_rule),
    (CategoryKind::ReplicaSend, replica_send_rule),
];

fn query_intent_rule(signals: &Signals, _: &Thresholds) -> Option<Category> {
    if !signals.query_intent {
        return None;
    }
    Some(Category::QueryIntent {
        step_ms: signals.longest_step.as_ref().map_or(0.0, |s| s.step_ms),
    })
}

fn client_server_rule(signals: &Signals, thresholds: &Thresholds) -> Option<Category> {
    signals
        .network
        .client_server
        .filter(|hop| hop.latency_ms > thresholds.network_ms)
        .map(Category::NetworkClientServer)
}

fn server_client_rule(signals: &Signals, thresholds: &Thresholds) -> Option<Category> {
    signals
        .network
        .server_client
        .filter(|hop| hop.latency_ms > thresholds.network_ms)
        .map(Category::NetworkServerClient)
}

fn abnormal_rule(signals: &Signals, _: &Thresholds) -> Option<Category> {
    signals.network.abnormal.map(Category::NetworkAbnormal)
}

fn raft_rule(signals: &Signals, thresholds: &Thresholds) -> Option<Category> {
    signals
        .raft
        .slowest
        .filter(|node| node.total_ms > thresholds.raft_ms)
        .map(Category::Raft)
}

fn store_send_rule(signals: &Signals, thresholds: &Thresholds) -> Option<Category> {
    signals
        .store_send
        .slowest
        .filter(|event| event.duration_ms > thresholds.store_send_ms)
        .map(Category::StoreSend)
}

fn replica_send_rule(signals: &Signals, thresholds: &Thresholds) -> Option<Category> {
    signals
        .replica_send
        .slowest
        .filter(|event| event.duration_ms > thresholds.replica_send_ms)
        .map(Category::ReplicaSend)
}

/// First matching rule wins; `Other` when none fire
pub fn classify(signals: &Signals, thresholds: &Thresholds) -> Category {
    RULES
        .iter()
        .find_map(|(_, rule)| rule(signals, thresholds))
        .unwrap_or(Category::Other)
}

/// Longest step of a classified commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongestStep {
    pub step_ms: f64,
    pub line: String,
}

/// A trace with its commit section located and classified
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTrace {
    pub trace: Trace,
    /// Index of the commit marker line within the trace
    pub commit_start: usize,
    pub commit_duration_ms: Option<f64>,
    pub longest_step: Option<LongestStep>,
    pub category: Category,
}

impl ClassifiedTrace {
    pub fn commit_lines(&self) -> &[LogLine] {
        &self.trace.lines[self.commit_start..]
    }

    /// Lines emitted for this record: the whole trace or only the commit section
    pub fn emitted_lines(&self, full_trace: bool) -> &[LogLine] {
        if full_trace {
            &self.trace.lines
        } else {
            self.commit_lines()
        }
    }
}

/// Why a trace did not produce a classified record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// No commit marker in the trace
    NoCommit,
    /// Commit duration outside the configured window
    Filtered,
}

/// Trace classification settings shared across sources
#[derive(Debug, Clone)]
pub struct Classifier {
    pub patterns: PatternBank,
    pub ignore: IgnoreList,
    pub thresholds: Thresholds,
    pub commit_filter: CommitFilter,
}

impl Classifier {
    /// Locate, filter and classify the commit phase of `trace`
    pub fn classify_trace(&self, trace: Trace) -> Result<ClassifiedTrace, Exclusion> {
        let (commit_start, commit_duration_ms, longest_step, category) = {
            let section = extract_commit(&self.patterns, &trace).ok_or(Exclusion::NoCommit)?;
            if !self.commit_filter.admits(section.duration_ms) {
                return Err(Exclusion::Filtered);
            }
            let signals = Signals::gather(&self.patterns, &self.ignore, &section, &self.thresholds);
            let category = classify(&signals, &self.thresholds);
            (
                section.start,
                section.duration_ms,
                signals.longest_step,
                category,
            )
        };
        Ok(ClassifiedTrace {
            trace,
            commit_start,
            commit_duration_ms,
            longest_step,
            category,
        })
    }
}
