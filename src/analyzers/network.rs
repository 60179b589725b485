//! Network round-trip analysis
//!
//! Client→server latency pairs each client-side Batch span with the nearest
//! following server-side Batch span. Server→client latency pairs each
//! "sending batch response" line with the nearest following "received batch
//! response" line. Latency is the difference of the cumulative elapsed
//! tokens.
//!
//! Pairing is positional. Nothing beyond the line patterns ties a client
//! line to its server line, so interleaved concurrent round trips can be
//! paired with the wrong counterpart, and one counterpart line may serve
//! several initiators.

use super::{timed_lines, TimedLine};
use crate::commit::CommitSection;
use crate::patterns::PatternBank;
use serde::Serialize;

const BATCH_OPERATION: &str = "=== operation:/cockroach.roachpb.Internal/Batch";
const CLIENT_SPAN: &str = "span.kind:‹client›";
const SERVER_SPAN: &str = "span.kind:‹server›";
const SERVER_RESPONSE: &str = "sending batch response";
const CLIENT_RECEIVE: &str = "received batch response";

/// Slowest one-way hop in one direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkHop {
    pub client_node: Option<u32>,
    pub server_node: Option<u32>,
    pub latency_ms: f64,
    /// Line number of the initiating line
    pub from_line: usize,
    /// Line number of the paired counterpart line
    pub to_line: usize,
}

/// Client→server and server→client maxima disagreeing on the same node pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkDiscrepancy {
    pub client_node: Option<u32>,
    pub server_node: Option<u32>,
    pub client_server_ms: f64,
    pub server_client_ms: f64,
    pub discrepancy_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkAnalysis {
    pub client_server: Option<NetworkHop>,
    pub server_client: Option<NetworkHop>,
    pub abnormal: Option<NetworkDiscrepancy>,
}

fn is_client_span(text: &str) -> bool {
    text.contains(BATCH_OPERATION) && text.contains(CLIENT_SPAN)
}

fn is_server_span(text: &str) -> bool {
    text.contains(BATCH_OPERATION) && text.contains(SERVER_SPAN)
}

fn is_server_response(text: &str) -> bool {
    text.contains(SERVER_RESPONSE)
}

fn is_client_receive(text: &str) -> bool {
    text.contains(CLIENT_RECEIVE)
}

/// Analyze round-trip latency; `abnormal_ms` gates the discrepancy flag
pub fn analyze_network(
    patterns: &PatternBank,
    section: &CommitSection<'_>,
    abnormal_ms: f64,
) -> NetworkAnalysis {
    let timed = timed_lines(patterns, section);

    let client_server = slowest_hop(&timed, is_client_span, is_server_span, |from, to| {
        (from.node, to.node)
    });
    let server_client = slowest_hop(&timed, is_server_response, is_client_receive, |from, to| {
        (to.node, from.node)
    });

    // Both directions must name the same fully identified node pair
    let abnormal = match (client_server, server_client) {
        (Some(cs), Some(sc))
            if cs.client_node.is_some()
                && cs.server_node.is_some()
                && cs.client_node == sc.client_node
                && cs.server_node == sc.server_node =>
        {
            let discrepancy_ms = (cs.latency_ms - sc.latency_ms).abs();
            (discrepancy_ms > abnormal_ms).then_some(NetworkDiscrepancy {
                client_node: cs.client_node,
                server_node: cs.server_node,
                client_server_ms: cs.latency_ms,
                server_client_ms: sc.latency_ms,
                discrepancy_ms,
            })
        }
        _ => None,
    };

    NetworkAnalysis {
        client_server,
        server_client,
        abnormal,
    }
}

/// Maximum latency over all initiator lines paired with their nearest following counterpart
fn slowest_hop(
    timed: &[TimedLine<'_>],
    initiator: fn(&str) -> bool,
    counterpart: fn(&str) -> bool,
    nodes: impl Fn(&TimedLine<'_>, &TimedLine<'_>) -> (Option<u32>, Option<u32>),
) -> Option<NetworkHop> {
    let mut slowest: Option<NetworkHop> = None;
    for (pos, from) in timed.iter().enumerate() {
        if !initiator(from.text) {
            continue;
        }
        let Some(to) = timed[pos + 1..].iter().find(|t| counterpart(t.text)) else {
            continue;
        };
        let latency_ms = to.cumulative_ms - from.cumulative_ms;
        if slowest.is_some_and(|s| s.latency_ms >= latency_ms) {
            continue;
        }
        let (client_node, server_node) = nodes(from, to);
        slowest = Some(NetworkHop {
            client_node,
            server_node,
            latency_ms,
            from_line: from.number,
            to_line: to.number,
        });
    }
    slowest
}
