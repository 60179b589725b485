//! Trace segmentation for interleaved multi-node logs
//!
//! A single pass over one source with one line of lookahead. The scanner is
//! either idle or capturing:
//!
//! - A threshold line always starts a new trace, flushing any trace already
//!   being captured.
//! - While capturing, every other line is appended. When the *next* line is
//!   a record header that is not itself a threshold line, the capture is
//!   flushed and the scanner goes idle.
//! - End of input flushes an open capture.
//!
//! Flushing keeps a trace only when its duration reaches the minimum and the
//! optional filter matches the trace text; otherwise it is dropped and
//! counted as discarded.

use crate::patterns::{PatternBank, TraceFilter};
use serde::Serialize;
use std::sync::Arc;

/// One raw line from a log source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    /// Opaque source identifier (usually the log file path)
    #[serde(skip)]
    pub source: Arc<str>,
    /// 1-based line number within the source
    pub number: usize,
    pub text: String,
}

/// A captured slow-transaction record
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub source: Arc<str>,
    /// Duration from the opening threshold line (ms)
    pub duration_ms: f64,
    /// Never empty; the first line is always a threshold line
    pub lines: Vec<LogLine>,
}

impl Trace {
    pub fn first_line(&self) -> &LogLine {
        &self.lines[0]
    }

    /// Concatenated trace text, newline separated
    pub fn text(&self) -> String {
        join_lines(&self.lines)
    }
}

pub(crate) fn join_lines(lines: &[LogLine]) -> String {
    let mut text = String::with_capacity(lines.iter().map(|l| l.text.len() + 1).sum());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        text.push_str(&line.text);
    }
    text
}

/// Segmentation settings
#[derive(Debug, Clone, Default)]
pub struct SegmentConfig {
    /// Minimum trace duration to keep (ms)
    pub min_threshold_ms: f64,
    pub filter: Option<TraceFilter>,
}

/// Output of segmenting one source
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub traces: Vec<Trace>,
    /// Captures dropped by the duration threshold or the filter
    pub discarded: usize,
    pub lines_scanned: usize,
}

enum ScanState {
    Idle,
    Capturing { duration_ms: f64, lines: Vec<LogLine> },
}

/// Two-state scanner turning a line sequence into traces
pub struct TraceSegmenter<'a> {
    patterns: &'a PatternBank,
    config: &'a SegmentConfig,
}

impl<'a> TraceSegmenter<'a> {
    pub fn new(patterns: &'a PatternBank, config: &'a SegmentConfig) -> Self {
        Self { patterns, config }
    }

    /// Segment `(line number, text)` pairs belonging to `source`
    pub fn segment<I>(&self, source: &str, lines: I) -> Segmentation
    where
        I: IntoIterator<Item = (usize, String)>,
    {
        let source: Arc<str> = Arc::from(source);
        let mut out = Segmentation::default();
        let mut state = ScanState::Idle;
        let mut iter = lines.into_iter().peekable();

        while let Some((number, text)) = iter.next() {
            out.lines_scanned += 1;
            let line = LogLine {
                source: Arc::clone(&source),
                number,
                text,
            };

            if self.patterns.is_threshold_line(&line.text) {
                if let ScanState::Capturing { duration_ms, lines } =
                    std::mem::replace(&mut state, ScanState::Idle)
                {
                    self.flush(&source, duration_ms, lines, &mut out);
                }
                state = ScanState::Capturing {
                    duration_ms: self.patterns.threshold_duration(&line.text),
                    lines: vec![line],
                };
                continue;
            }

            let ScanState::Capturing { lines, .. } = &mut state else {
                continue;
            };
            lines.push(line);

            let record_ends = iter.peek().is_some_and(|(_, next)| {
                self.patterns.is_entry_boundary(next) && !self.patterns.is_threshold_line(next)
            });
            if record_ends {
                if let ScanState::Capturing { duration_ms, lines } =
                    std::mem::replace(&mut state, ScanState::Idle)
                {
                    self.flush(&source, duration_ms, lines, &mut out);
                }
            }
        }

        if let ScanState::Capturing { duration_ms, lines } = state {
            self.flush(&source, duration_ms, lines, &mut out);
        }

        tracing::debug!(
            source = %source,
            lines = out.lines_scanned,
            kept = out.traces.len(),
            discarded = out.discarded,
            "segmented source"
        );
        out
    }

    fn flush(&self, source: &Arc<str>, duration_ms: f64, lines: Vec<LogLine>, out: &mut Segmentation) {
        if lines.is_empty() || duration_ms < self.config.min_threshold_ms {
            out.discarded += 1;
            return;
        }
        if let Some(filter) = &self.config.filter {
            if !filter.matches(&join_lines(&lines)) {
                out.discarded += 1;
                return;
            }
        }
        out.traces.push(Trace {
            source: Arc::clone(source),
            duration_ms,
            lines,
        });
    }
}

/// Number raw text lines from 1
pub fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, String)> + '_ {
    text.lines().enumerate().map(|(i, l)| (i + 1, l.to_string()))
}
