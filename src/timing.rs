//! Step timing analysis for a commit section
//!
//! Every dual-timestamp line becomes a [`TimingEvent`]. The dominant step is
//! the event with the largest step time among events not on the ignore
//! list; when all events are ignored the full list is used instead.

use crate::commit::CommitSection;
use crate::patterns::{IgnoreList, PatternBank, QUERY_INTENT_MARKER};

/// One timed step from a dual-timestamp line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingEvent<'a> {
    pub cumulative_ms: f64,
    pub step_ms: f64,
    pub line: &'a str,
    pub ignored: bool,
}

/// Result of step timing analysis
#[derive(Debug, Clone, PartialEq)]
pub struct TimingAnalysis<'a> {
    pub events: Vec<TimingEvent<'a>>,
    pub dominant: TimingEvent<'a>,
    /// Dominant step is the pre-commit QueryIntent batch response
    pub query_intent: bool,
}

/// Extract timing events from dual-timestamp lines
pub fn timing_events<'a>(
    patterns: &PatternBank,
    ignore: &IgnoreList,
    section: &CommitSection<'a>,
) -> Vec<TimingEvent<'a>> {
    section
        .lines
        .iter()
        .filter_map(|line| {
            let (cumulative_ms, step_ms) = patterns.dual_elapsed(&line.text)?;
            Some(TimingEvent {
                cumulative_ms,
                step_ms,
                line: line.text.as_str(),
                ignored: ignore.is_ignored(&line.text),
            })
        })
        .collect()
}

/// Find the dominant step; `None` only when no line carries dual timestamps
pub fn analyze_timing<'a>(
    patterns: &PatternBank,
    ignore: &IgnoreList,
    section: &CommitSection<'a>,
) -> Option<TimingAnalysis<'a>> {
    let events = timing_events(patterns, ignore, section);
    let dominant = longest_step(events.iter().filter(|e| !e.ignored))
        .or_else(|| longest_step(events.iter()))?;
    Some(TimingAnalysis {
        query_intent: dominant.line.contains(QUERY_INTENT_MARKER),
        dominant,
        events,
    })
}

// First event wins on ties.
fn longest_step<'e, 'a: 'e>(
    events: impl Iterator<Item = &'e TimingEvent<'a>>,
) -> Option<TimingEvent<'a>> {
    events.fold(None, |best: Option<TimingEvent<'a>>, e| match best {
        Some(b) if b.step_ms >= e.step_ms => Some(b),
        _ => Some(*e),
    })
}
