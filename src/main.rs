use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use txn_triage::cli::{BundleArgs, ClassifyArgs, Cli, Command, ExtractArgs, OutputFormat};
use txn_triage::config::TriageConfig;
use txn_triage::csv_output::{CsvOutput, CsvRecord};
use txn_triage::json_output::JsonOutput;
use txn_triage::pipeline::Triage;
use txn_triage::report::{self, CategorySummary};
use txn_triage::source::find_log_files;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Defaults, then the config file, then flags
fn load_config(bundle: &BundleArgs) -> Result<TriageConfig> {
    match &bundle.config {
        Some(path) => TriageConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(TriageConfig::default()),
    }
}

fn build_triage(bundle: &BundleArgs, config: &TriageConfig) -> Result<Triage> {
    let jobs = bundle.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    Ok(Triage::new(config)?.with_jobs(jobs))
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let bundle = &args.bundle;
    let mut config = load_config(bundle)?;
    bundle.apply(&mut config);
    let triage = build_triage(bundle, &config)?;

    let sources = find_log_files(&bundle.debug_zip)?;
    tracing::info!(files = sources.len(), bundle = %bundle.debug_zip.display(), "scanning bundle");
    let report = triage.extract(&sources);

    let out_dir = bundle.output_dir("traces");
    let written_to = if bundle.no_write {
        None
    } else {
        report::write_traces(&out_dir, &report.traces)
            .with_context(|| format!("Failed to write {}", out_dir.display()))?;
        Some(out_dir.as_path())
    };

    match bundle.format {
        OutputFormat::Text => {
            print!(
                "{}",
                report::extraction_summary(&report, config.min_trace_ms, written_to)
            );
        }
        OutputFormat::Json => {
            println!(
                "{}",
                JsonOutput::from_extraction(&report, bundle.with_lines).to_json()?
            );
        }
        OutputFormat::Csv => {
            let mut csv = CsvOutput::new(false);
            for trace in &report.traces {
                csv.add_record(CsvRecord::from(trace));
            }
            print!("{}", csv.to_csv());
        }
    }
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let bundle = &args.bundle;
    let mut config = load_config(bundle)?;
    args.apply(&mut config);
    let triage = build_triage(bundle, &config)?;

    let sources = find_log_files(&bundle.debug_zip)?;
    tracing::info!(files = sources.len(), bundle = %bundle.debug_zip.display(), "scanning bundle");
    let report = triage.classify(&sources);

    let out_dir = bundle.output_dir("extracted_commits");
    let written_to: Option<&Path> = if bundle.no_write {
        None
    } else {
        report::write_classified(&out_dir, &report, args.full_trace)
            .with_context(|| format!("Failed to write {}", out_dir.display()))?;
        Some(out_dir.as_path())
    };

    match bundle.format {
        OutputFormat::Text => {
            let summary = CategorySummary::from_report(&report);
            print!("{}", report::classification_summary(&summary, written_to));
        }
        OutputFormat::Json => {
            println!(
                "{}",
                JsonOutput::from_classification(&report, bundle.with_lines, args.full_trace)
                    .to_json()?
            );
        }
        OutputFormat::Csv => {
            let mut csv = CsvOutput::new(true);
            for record in &report.records {
                csv.add_record(CsvRecord::from(record));
            }
            print!("{}", csv.to_csv());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(cli.debug);

    match cli.command {
        Command::Extract(args) => run_extract(args),
        Command::Classify(args) => run_classify(args),
    }
}
