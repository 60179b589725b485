//! CSV output format for ranked records
//!
//! One row per trace or classified commit, for spreadsheet analysis.

use crate::classify::ClassifiedTrace;
use crate::rank::Ranked;
use crate::segment::Trace;

/// CSV record for a single ranked trace or commit
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub rank: usize,
    pub source: String,
    pub first_line: usize,
    pub trace_duration_ms: f64,
    pub commit_duration_ms: Option<f64>,
    pub category: Option<String>,
    pub node: Option<u32>,
    pub latency_ms: Option<f64>,
}

impl From<&Ranked<Trace>> for CsvRecord {
    fn from(ranked: &Ranked<Trace>) -> Self {
        Self {
            rank: ranked.rank,
            source: ranked.item.source.to_string(),
            first_line: ranked.item.first_line().number,
            trace_duration_ms: ranked.item.duration_ms,
            commit_duration_ms: None,
            category: None,
            node: None,
            latency_ms: None,
        }
    }
}

impl From<&Ranked<ClassifiedTrace>> for CsvRecord {
    fn from(ranked: &Ranked<ClassifiedTrace>) -> Self {
        let item = &ranked.item;
        Self {
            rank: ranked.rank,
            source: item.trace.source.to_string(),
            first_line: item.trace.first_line().number,
            trace_duration_ms: item.trace.duration_ms,
            commit_duration_ms: item.commit_duration_ms,
            category: Some(item.category.kind().to_string()),
            node: item.category.node(),
            latency_ms: item.category.latency_ms(),
        }
    }
}

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    records: Vec<CsvRecord>,
    include_classification: bool,
}

impl CsvOutput {
    /// Create a new CSV output formatter
    pub fn new(include_classification: bool) -> Self {
        Self {
            records: Vec::new(),
            include_classification,
        }
    }

    pub fn add_record(&mut self, record: CsvRecord) {
        self.records.push(record);
    }

    fn header(&self) -> String {
        let mut headers = vec!["rank", "source", "first_line", "trace_duration_ms"];

        if self.include_classification {
            headers.extend(["commit_duration_ms", "category", "node", "latency_ms"]);
        }

        headers.join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_record(&self, record: &CsvRecord) -> String {
        let mut fields = vec![
            record.rank.to_string(),
            Self::escape_field(&record.source),
            record.first_line.to_string(),
            format!("{:.3}", record.trace_duration_ms),
        ];

        if self.include_classification {
            fields.push(
                record
                    .commit_duration_ms
                    .map(|ms| format!("{:.3}", ms))
                    .unwrap_or_default(),
            );
            fields.push(record.category.clone().unwrap_or_default());
            fields.push(record.node.map(|n| n.to_string()).unwrap_or_default());
            fields.push(
                record
                    .latency_ms
                    .map(|ms| format!("{:.3}", ms))
                    .unwrap_or_default(),
            );
        }

        fields.join(",")
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        output.push_str(&self.header());
        output.push('\n');

        for record in &self.records {
            output.push_str(&self.format_record(record));
            output.push('\n');
        }

        output
    }
}
