#![no_main]

use libfuzzer_sys::fuzz_target;
use txn_triage::commit::extract_commit;
use txn_triage::config::TriageConfig;
use txn_triage::patterns::PatternBank;
use txn_triage::segment::{numbered_lines, SegmentConfig, TraceSegmenter};

fuzz_target!(|data: &[u8]| {
    // Log files are read lossily, so do the same here
    let text = String::from_utf8_lossy(data);
    let bank = PatternBank::new();
    let config = SegmentConfig {
        min_threshold_ms: 0.0,
        filter: None,
    };
    let out = TraceSegmenter::new(&bank, &config).segment("fuzz.log", numbered_lines(&text));

    let classifier = match txn_triage::pipeline::Triage::new(&TriageConfig::default()) {
        Ok(triage) => triage.classifier().clone(),
        Err(_) => return,
    };
    for trace in out.traces {
        assert!(bank.is_threshold_line(&trace.first_line().text));
        let _ = extract_commit(&bank, &trace);
        let _ = classifier.classify_trace(trace);
    }
});
