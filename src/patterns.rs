//! Line classification for diagnostic log text
//!
//! All predicates here are pure tests against a single line. The regex bank
//! is compiled once per run and shared by reference across every source,
//! trace and analyzer.
//!
//! # Recognized line shapes
//!
//! ```text
//! n1> I250804 14:03:11.512733 8813 17@util/log/event_log.go:32 ⋮ [n1] SQL txn took 412ms, exceeding threshold of 200ms:
//!      0.000ms      0.000ms    === operation:sql txn
//!    985.822ms      1.204ms    event:‹portal resolved to: ‹COMMIT TRANSACTION››
//!    990.102ms      4.280ms        === operation:/cockroach.roachpb.Internal/Batch node:‹3› span.kind:‹client›
//! ```

use crate::error::TriageError;
use regex::Regex;

/// Literal marking the start of a trace's commit phase
pub const COMMIT_MARKER: &str = "portal resolved to: ‹COMMIT TRANSACTION›";

/// Literal identifying a commit that waited on a pre-commit QueryIntent batch
pub const QUERY_INTENT_MARKER: &str = "received pre-commit QueryIntent batch response";

/// Default trace filter used by the command line
pub const DEFAULT_FILTER: &str = "portal resolved to.*COMMIT";

/// Timing lines that never count as the dominant step
pub const DEFAULT_IGNORED: &[&str] = &[
    "making txn commit explicit",
    "looking up descriptors for ids",
];

const THRESHOLD_PATTERN: &str = r"SQL txn took .*exceeding threshold of .*:";
const DURATION_PATTERN: &str = r"SQL txn took ([\d.]+)ms";
const BOUNDARY_PATTERN: &str =
    r"^[^>]+> [IWEF]\d{6} \d{2}:\d{2}:\d{2}\.\d{6} \d+ \d+@[^:]+\.go:";
const ELAPSED_PATTERN: &str = r"^\s*(\d+\.\d+)ms";
const DUAL_ELAPSED_PATTERN: &str = r"^\s*(\d+\.\d+)ms\s+(\d+\.\d+)ms";
const NODE_FIELD_PATTERN: &str = r"node:‹(\d+)›";
const NODE_TAG_PATTERN: &str = r"\[n(\d+)[,\]]";

fn compile(pattern: &'static str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

/// Compiled pattern bank shared by the segmenter and all analyzers
#[derive(Debug, Clone)]
pub struct PatternBank {
    threshold: Regex,
    duration: Regex,
    boundary: Regex,
    elapsed: Regex,
    dual_elapsed: Regex,
    node_field: Regex,
    node_tag: Regex,
}

impl PatternBank {
    pub fn new() -> Self {
        Self {
            threshold: compile(THRESHOLD_PATTERN),
            duration: compile(DURATION_PATTERN),
            boundary: compile(BOUNDARY_PATTERN),
            elapsed: compile(ELAPSED_PATTERN),
            dual_elapsed: compile(DUAL_ELAPSED_PATTERN),
            node_field: compile(NODE_FIELD_PATTERN),
            node_tag: compile(NODE_TAG_PATTERN),
        }
    }

    /// Line reports a SQL transaction exceeding the slow-operation threshold
    pub fn is_threshold_line(&self, line: &str) -> bool {
        self.threshold.is_match(line)
    }

    /// Duration carried by a threshold line, 0.0 when the token is unparsable
    pub fn threshold_duration(&self, line: &str) -> f64 {
        self.duration
            .captures(line)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .filter(|ms| ms.is_finite())
            .unwrap_or(0.0)
    }

    /// Line opens an independent log record (node tag, dated header, Go source location)
    pub fn is_entry_boundary(&self, line: &str) -> bool {
        self.boundary.is_match(line)
    }

    pub fn is_commit_marker(&self, line: &str) -> bool {
        line.contains(COMMIT_MARKER)
    }

    /// Leading cumulative elapsed token (`985.822ms`)
    pub fn elapsed(&self, line: &str) -> Option<f64> {
        self.elapsed
            .captures(line)
            .and_then(|caps| caps[1].parse().ok())
    }

    /// Leading cumulative and step elapsed tokens (`267.242ms    214.906ms`)
    pub fn dual_elapsed(&self, line: &str) -> Option<(f64, f64)> {
        let caps = self.dual_elapsed.captures(line)?;
        let cumulative = caps[1].parse().ok()?;
        let step = caps[2].parse().ok()?;
        Some((cumulative, step))
    }

    /// Node id from a `node:‹N›` span tag, falling back to a `[nN,` log tag
    pub fn node_id(&self, line: &str) -> Option<u32> {
        self.node_field
            .captures(line)
            .or_else(|| self.node_tag.captures(line))
            .and_then(|caps| caps[1].parse().ok())
    }
}

impl Default for PatternBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing lines excluded from dominant-step selection
#[derive(Debug, Clone)]
pub struct IgnoreList {
    patterns: Vec<Regex>,
}

impl IgnoreList {
    /// Default exclusions plus caller-supplied patterns
    pub fn with_extra(extra: &[String]) -> Result<Self, TriageError> {
        let mut list = Self::default();
        for pattern in extra {
            let re = Regex::new(pattern).map_err(|source| TriageError::InvalidIgnorePattern {
                pattern: pattern.clone(),
                source,
            })?;
            list.patterns.push(re);
        }
        Ok(list)
    }

    pub fn is_ignored(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_IGNORED
                .iter()
                .map(|p| Regex::new(&regex::escape(p)).expect("escaped literal is valid"))
                .collect(),
        }
    }
}

/// Caller-supplied regular expression a trace's text must match to be kept
#[derive(Debug, Clone)]
pub struct TraceFilter {
    pattern: Regex,
}

impl TraceFilter {
    /// Compile a filter; an invalid pattern is an error, never "no filter"
    pub fn new(pattern: &str) -> Result<Self, TriageError> {
        let pattern = Regex::new(pattern).map_err(|source| TriageError::InvalidFilter {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern })
    }

    /// Compile an optional filter; `None` and the empty string both disable filtering
    pub fn optional(pattern: Option<&str>) -> Result<Option<Self>, TriageError> {
        match pattern {
            Some(p) if !p.is_empty() => Self::new(p).map(Some),
            _ => Ok(None),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD_LINE: &str = "n1> I250804 14:03:11.512733 8813 17@util/log/event_log.go:32 ⋮ [n1] SQL txn took 412.5ms, exceeding threshold of 200ms:";

    #[test]
    fn test_threshold_line_detected() {
        let bank = PatternBank::new();
        assert!(bank.is_threshold_line(THRESHOLD_LINE));
        assert!(!bank.is_threshold_line("SQL txn took 12ms"));
    }

    #[test]
    fn test_threshold_duration_parsed() {
        let bank = PatternBank::new();
        assert_eq!(bank.threshold_duration(THRESHOLD_LINE), 412.5);
    }

    #[test]
    fn test_threshold_duration_unparsable_defaults_to_zero() {
        let bank = PatternBank::new();
        let line = "SQL txn took 1.2.3ms, exceeding threshold of 200ms:";
        assert!(bank.is_threshold_line(line));
        assert_eq!(bank.threshold_duration(line), 0.0);
        assert_eq!(bank.threshold_duration("SQL txn took ?ms, exceeding threshold of x:"), 0.0);
    }

    #[test]
    fn test_entry_boundary() {
        let bank = PatternBank::new();
        assert!(bank.is_entry_boundary(
            "n2> I250911 09:00:00.000001 42 1@kv/kvserver/replica.go:120 ⋮ [n2] something"
        ));
        assert!(bank.is_entry_boundary(
            "n2> W250911 09:00:00.000001 42 1@kv/kvserver/replica.go:120 ⋮ warn"
        ));
        assert!(!bank.is_entry_boundary("     1.000ms      0.500ms    event:foo"));
        assert!(!bank.is_entry_boundary("n2> I2509 09:00:00.000001 42 1@x.go:1"));
    }

    #[test]
    fn test_commit_marker() {
        let bank = PatternBank::new();
        assert!(bank.is_commit_marker(
            "   985.822ms      1.204ms    event:‹portal resolved to: ‹COMMIT TRANSACTION››"
        ));
        assert!(!bank.is_commit_marker("portal resolved to: ‹SELECT 1›"));
    }

    #[test]
    fn test_elapsed_tokens() {
        let bank = PatternBank::new();
        assert_eq!(bank.elapsed("   985.822ms      1.204ms    event"), Some(985.822));
        assert_eq!(
            bank.dual_elapsed("   267.242ms    214.906ms    event"),
            Some((267.242, 214.906))
        );
        assert_eq!(bank.dual_elapsed("   267.242ms    event"), None);
        assert_eq!(bank.elapsed("event 267.242ms"), None);
        assert_eq!(bank.elapsed("267ms"), None);
    }

    #[test]
    fn test_node_id_sources() {
        let bank = PatternBank::new();
        assert_eq!(bank.node_id("=== operation:x node:‹3› span.kind:‹client›"), Some(3));
        assert_eq!(bank.node_id("event:kv/kvserver/store_send.go:123 [n7,s7,r42/1]"), Some(7));
        assert_eq!(bank.node_id("event:kv/kvserver/store_send.go:123 [n12]"), Some(12));
        assert_eq!(bank.node_id("no node here"), None);
    }

    #[test]
    fn test_ignore_list_defaults() {
        let ignore = IgnoreList::default();
        assert_eq!(ignore.len(), 2);
        assert!(ignore.is_ignored("1.0ms 2.0ms event:making txn commit explicit"));
        assert!(!ignore.is_ignored("1.0ms 2.0ms event:applying command"));
    }

    #[test]
    fn test_ignore_list_extra_patterns() {
        let ignore = IgnoreList::with_extra(&["acquiring latches".to_string()]).unwrap();
        assert_eq!(ignore.len(), 3);
        assert!(ignore.is_ignored("event:acquiring latches"));
        assert!(IgnoreList::with_extra(&["[".to_string()]).is_err());
    }

    #[test]
    fn test_trace_filter_invalid_is_error() {
        let err = TraceFilter::new("portal(").unwrap_err();
        assert!(matches!(err, TriageError::InvalidFilter { .. }));
    }

    #[test]
    fn test_trace_filter_optional() {
        assert!(TraceFilter::optional(None).unwrap().is_none());
        assert!(TraceFilter::optional(Some("")).unwrap().is_none());
        let filter = TraceFilter::optional(Some(DEFAULT_FILTER)).unwrap().unwrap();
        assert!(filter.matches(COMMIT_MARKER));
        assert!(TraceFilter::optional(Some("(")).is_err());
    }
}
