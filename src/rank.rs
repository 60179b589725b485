//! Duration filtering and ranking
//!
//! Ranking is a stable descending sort: records with equal keys keep their
//! discovery order. Ranks are 1-based and dense.

use serde::Serialize;

/// A record with its position in the global ordering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<T> {
    pub rank: usize,
    #[serde(flatten)]
    pub item: T,
}

/// Sort descending by `key` (stable) and assign ranks from 1
pub fn rank_by<T>(mut items: Vec<T>, key: impl Fn(&T) -> f64) -> Vec<Ranked<T>> {
    items.sort_by(|a, b| key(b).total_cmp(&key(a)));
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Ranked { rank: i + 1, item })
        .collect()
}

/// Commit duration window applied before classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitFilter {
    pub min_ms: f64,
    pub max_ms: Option<f64>,
}

impl CommitFilter {
    /// An absent duration is always admitted
    pub fn admits(&self, duration_ms: Option<f64>) -> bool {
        let Some(ms) = duration_ms else {
            return true;
        };
        ms >= self.min_ms && self.max_ms.map_or(true, |max| ms <= max)
    }
}
