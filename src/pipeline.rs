//! End-to-end triage over many log sources
//!
//! Each source is read, segmented and (for classification) classified on
//! its own, so sources are spread across worker threads. Results are merged
//! in source order before the global ranking, which keeps tie-breaking
//! identical to a sequential run.

use crate::classify::{CategoryKind, ClassifiedTrace, Classifier, Exclusion};
use crate::config::TriageConfig;
use crate::error::{SourceError, TriageError};
use crate::patterns::PatternBank;
use crate::rank::{rank_by, Ranked};
use crate::segment::{SegmentConfig, Segmentation, Trace, TraceSegmenter};
use crate::source::LineSource;
use std::collections::BTreeMap;

/// Result of the trace-level extraction pass
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Kept traces, slowest first
    pub traces: Vec<Ranked<Trace>>,
    pub sources_scanned: usize,
    /// Readable sources that produced no traces
    pub empty_sources: usize,
    pub skipped_sources: Vec<SourceError>,
    /// Captures dropped by the duration threshold or filter
    pub discarded: usize,
    /// Kept traces per node
    pub per_node: BTreeMap<String, usize>,
}

/// Result of the commit-level classification pass
#[derive(Debug, Default)]
pub struct ClassificationReport {
    /// Classified commits, slowest commit first
    pub records: Vec<Ranked<ClassifiedTrace>>,
    pub sources_scanned: usize,
    pub skipped_sources: Vec<SourceError>,
    /// Traces kept by segmentation
    pub traces_found: usize,
    /// Traces with no commit section
    pub no_commit: usize,
    /// Commits outside the duration window
    pub filtered: usize,
}

impl ClassificationReport {
    /// Record count per category, including empty categories
    pub fn counts(&self) -> BTreeMap<CategoryKind, usize> {
        let mut counts: BTreeMap<CategoryKind, usize> =
            CategoryKind::ALL.iter().map(|k| (*k, 0)).collect();
        for record in &self.records {
            *counts.entry(record.item.category.kind()).or_default() += 1;
        }
        counts
    }
}

struct SourceClassification {
    records: Vec<ClassifiedTrace>,
    traces_found: usize,
    no_commit: usize,
    filtered: usize,
}

/// Compiled configuration for a triage run
#[derive(Debug, Clone)]
pub struct Triage {
    segment: SegmentConfig,
    classifier: Classifier,
    jobs: usize,
}

impl Triage {
    /// Compile patterns and validate configuration; invalid regexes are fatal here
    pub fn new(config: &TriageConfig) -> Result<Self, TriageError> {
        Ok(Self {
            segment: config.segment_config()?,
            classifier: Classifier {
                patterns: PatternBank::new(),
                ignore: config.ignore_list()?,
                thresholds: config.thresholds,
                commit_filter: config.commit_filter(),
            },
            jobs: 1,
        })
    }

    /// Number of worker threads used across sources
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn patterns(&self) -> &PatternBank {
        &self.classifier.patterns
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Read and segment a single source
    pub fn segment_source<S: LineSource>(&self, source: &S) -> Result<Segmentation, SourceError> {
        let lines = source.read_lines()?;
        Ok(TraceSegmenter::new(&self.classifier.patterns, &self.segment).segment(source.id(), lines))
    }

    /// Extract slow traces from every source, ranked by trace duration
    pub fn extract<S: LineSource + Sync>(&self, sources: &[S]) -> ExtractionReport {
        let scans = fan_out(sources, self.jobs, |source| {
            (source.node().to_string(), self.segment_source(source))
        });

        let mut report = ExtractionReport {
            sources_scanned: sources.len(),
            ..ExtractionReport::default()
        };
        let mut traces = Vec::new();
        for (node, scan) in scans {
            match scan {
                Ok(segmentation) => {
                    report.discarded += segmentation.discarded;
                    if segmentation.traces.is_empty() {
                        report.empty_sources += 1;
                        continue;
                    }
                    *report.per_node.entry(node).or_default() += segmentation.traces.len();
                    traces.extend(segmentation.traces);
                }
                Err(err) => {
                    tracing::warn!("{}", err);
                    report.skipped_sources.push(err);
                }
            }
        }
        report.traces = rank_by(traces, |t| t.duration_ms);

        tracing::info!(
            sources = report.sources_scanned,
            traces = report.traces.len(),
            skipped = report.skipped_sources.len(),
            "extraction complete"
        );
        report
    }

    /// Extract, locate commit sections and classify, ranked by commit duration
    pub fn classify<S: LineSource + Sync>(&self, sources: &[S]) -> ClassificationReport {
        let outcomes = fan_out(sources, self.jobs, |source| self.classify_source(source));

        let mut report = ClassificationReport {
            sources_scanned: sources.len(),
            ..ClassificationReport::default()
        };
        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(source) => {
                    report.traces_found += source.traces_found;
                    report.no_commit += source.no_commit;
                    report.filtered += source.filtered;
                    records.extend(source.records);
                }
                Err(err) => {
                    tracing::warn!("{}", err);
                    report.skipped_sources.push(err);
                }
            }
        }
        report.records = rank_by(records, |r| r.commit_duration_ms.unwrap_or(0.0));

        tracing::info!(
            sources = report.sources_scanned,
            traces = report.traces_found,
            classified = report.records.len(),
            no_commit = report.no_commit,
            filtered = report.filtered,
            "classification complete"
        );
        report
    }

    fn classify_source<S: LineSource>(
        &self,
        source: &S,
    ) -> Result<SourceClassification, SourceError> {
        let segmentation = self.segment_source(source)?;
        let mut out = SourceClassification {
            records: Vec::new(),
            traces_found: segmentation.traces.len(),
            no_commit: 0,
            filtered: 0,
        };
        for trace in segmentation.traces {
            match self.classifier.classify_trace(trace) {
                Ok(record) => out.records.push(record),
                Err(Exclusion::NoCommit) => out.no_commit += 1,
                Err(Exclusion::Filtered) => out.filtered += 1,
            }
        }
        Ok(out)
    }
}

/// Apply `work` to every item on up to `jobs` threads, preserving item order
fn fan_out<S, R, F>(items: &[S], jobs: usize, work: F) -> Vec<R>
where
    S: Sync,
    R: Send,
    F: Fn(&S) -> R + Sync,
{
    if jobs <= 1 || items.len() <= 1 {
        return items.iter().map(work).collect();
    }

    let chunk_size = items.len().div_ceil(jobs);
    let work = &work;
    crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move |_| chunk.iter().map(work).collect::<Vec<R>>()))
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
