/// Segmentation and classification throughput over a synthetic node log
///
/// Guards against regressions in the per-line regex work, which dominates
/// run time on large bundles.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use txn_triage::config::TriageConfig;
use txn_triage::patterns::PatternBank;
use txn_triage::pipeline::Triage;
use txn_triage::segment::{numbered_lines, TraceSegmenter};
use txn_triage::source::TextSource;

/// Build a log with `traces` slow transactions interleaved with noise
fn synthetic_log(traces: usize) -> String {
    let mut lines = Vec::new();
    for i in 0..traces {
        let node = i % 5 + 1;
        lines.push(format!(
            "n{node}> I250804 14:03:11.512733 8813 17@sql/exec_log.go:32 ⋮ [n{node}] SQL txn took {}ms, exceeding threshold of 200ms:",
            200 + i % 400
        ));
        lines.push("     0.000ms      0.000ms    === operation:sql txn".to_string());
        lines.push(
            "   100.000ms      1.000ms    event:‹portal resolved to: ‹COMMIT TRANSACTION››"
                .to_string(),
        );
        lines.push(format!(
            "   130.000ms     30.000ms    event:kv/kvserver/store_send.go:150 [n{node},s{node}] executing EndTxn"
        ));
        lines.push(format!(
            "   190.000ms     60.000ms    event:kv/kvserver/replica_raft.go:100 [n{node}] submitting proposal"
        ));
        lines.push(format!(
            "n{node}> I250804 14:03:12.000001 42 1@kv/kvserver/replica.go:88 ⋮ [n{node}] heartbeat"
        ));
    }
    lines.join("\n")
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");
    let bank = PatternBank::new();
    let config = TriageConfig::default()
        .segment_config()
        .expect("default filter compiles");

    for traces in [100usize, 1_000] {
        let log = synthetic_log(traces);
        group.throughput(Throughput::Bytes(log.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(traces), &log, |b, log| {
            b.iter(|| {
                let out = TraceSegmenter::new(&bank, &config).segment("bench.log", numbered_lines(log));
                black_box(out);
            });
        });
    }

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let sources: Vec<TextSource> = (1..=8)
        .map(|n| TextSource {
            id: format!("nodes/{n}/logs/cockroach.log"),
            node: n.to_string(),
            text: synthetic_log(250),
        })
        .collect();

    for jobs in [1usize, 4] {
        let triage = Triage::new(&TriageConfig::default())
            .expect("default config is valid")
            .with_jobs(jobs);
        group.bench_function(BenchmarkId::new("jobs", jobs), |b| {
            b.iter(|| black_box(triage.classify(&sources)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_segmentation, bench_classification);
criterion_main!(benches);
