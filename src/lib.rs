//! txn-triage - slow transaction triage for distributed SQL debug bundles
//!
//! This library segments node log files into slow-transaction traces,
//! locates the COMMIT phase of each trace and classifies what dominated
//! its latency (network hops, Raft replication, store/replica sends or
//! pre-commit intent checks).

pub mod analyzers;
pub mod classify;
pub mod cli;
pub mod commit;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod json_output;
pub mod patterns;
pub mod pipeline;
pub mod rank;
pub mod report;
pub mod segment;
pub mod source;
pub mod timing;
