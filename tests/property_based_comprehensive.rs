//! Property-based tests for segmentation, commit extraction and ranking
//!
//! Log sources are generated as random mixes of threshold lines, unrelated
//! record headers and timing continuation lines.

use proptest::prelude::*;
use txn_triage::commit::extract_commit;
use txn_triage::patterns::{PatternBank, TraceFilter};
use txn_triage::rank::rank_by;
use txn_triage::segment::{numbered_lines, SegmentConfig, TraceSegmenter};

fn log_line() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..9, 0u32..1000).prop_map(|(node, ms)| format!(
            "n{node}> I250804 14:03:11.512733 8813 17@sql/exec_log.go:32 ⋮ [n{node}] SQL txn took {ms}ms, exceeding threshold of 200ms:"
        )),
        (1u32..9).prop_map(|node| format!(
            "n{node}> W250804 14:03:12.000001 42 1@kv/kvserver/replica.go:88 ⋮ [n{node}] unrelated"
        )),
        (0u32..500, 0u32..100).prop_map(|(at, step)| format!(
            "   {at}.000ms   {step}.000ms    event:[n1] step"
        )),
        (0u32..500).prop_map(|at| format!(
            "   {at}.000ms      1.000ms    event:‹portal resolved to: ‹COMMIT TRANSACTION››"
        )),
        "[a-z][a-z ]{0,20}",
    ]
}

fn source() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(log_line(), 0..60)
}

fn unfiltered(min_threshold_ms: f64) -> SegmentConfig {
    SegmentConfig {
        min_threshold_ms,
        filter: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_traces_open_with_threshold_line(lines in source(), min in 0u32..1000) {
        let bank = PatternBank::new();
        let config = unfiltered(min as f64);
        let text = lines.join("\n");
        let out = TraceSegmenter::new(&bank, &config).segment("s.log", numbered_lines(&text));

        for trace in &out.traces {
            prop_assert!(!trace.lines.is_empty());
            prop_assert!(bank.is_threshold_line(&trace.first_line().text));
            prop_assert!(trace.duration_ms >= min as f64);
            // Only the opening line is a threshold line
            prop_assert!(trace.lines[1..].iter().all(|l| !bank.is_threshold_line(&l.text)));
        }
    }

    #[test]
    fn prop_traces_are_ordered_disjoint_subsequences(lines in source()) {
        let bank = PatternBank::new();
        let config = unfiltered(0.0);
        let text = lines.join("\n");
        let out = TraceSegmenter::new(&bank, &config).segment("s.log", numbered_lines(&text));

        let numbers: Vec<usize> = out
            .traces
            .iter()
            .flat_map(|t| t.lines.iter().map(|l| l.number))
            .collect();
        prop_assert!(numbers.windows(2).all(|w| w[0] < w[1]));
        for trace in &out.traces {
            for line in &trace.lines {
                prop_assert_eq!(&line.text, &lines[line.number - 1]);
            }
        }
    }

    #[test]
    fn prop_every_threshold_line_is_accounted_for(lines in source()) {
        let bank = PatternBank::new();
        let config = unfiltered(300.0);
        let text = lines.join("\n");
        let out = TraceSegmenter::new(&bank, &config).segment("s.log", numbered_lines(&text));

        let openers = lines.iter().filter(|l| bank.is_threshold_line(l)).count();
        prop_assert_eq!(out.traces.len() + out.discarded, openers);
        prop_assert_eq!(out.lines_scanned, lines.len());
    }

    #[test]
    fn prop_segmentation_is_deterministic(lines in source()) {
        let bank = PatternBank::new();
        let config = SegmentConfig {
            min_threshold_ms: 200.0,
            filter: TraceFilter::optional(Some("COMMIT")).unwrap(),
        };
        let text = lines.join("\n");
        let first = TraceSegmenter::new(&bank, &config).segment("s.log", numbered_lines(&text));
        let second = TraceSegmenter::new(&bank, &config).segment("s.log", numbered_lines(&text));
        prop_assert_eq!(first.traces, second.traces);
        prop_assert_eq!(first.discarded, second.discarded);
    }

    #[test]
    fn prop_commit_section_is_trace_suffix(lines in source()) {
        let bank = PatternBank::new();
        let config = unfiltered(0.0);
        let text = lines.join("\n");
        let out = TraceSegmenter::new(&bank, &config).segment("s.log", numbered_lines(&text));

        for trace in &out.traces {
            match extract_commit(&bank, trace) {
                Some(section) => {
                    prop_assert!(bank.is_commit_marker(&section.lines[0].text));
                    prop_assert_eq!(section.lines, &trace.lines[section.start..]);
                    prop_assert!(trace.lines[..section.start]
                        .iter()
                        .all(|l| !bank.is_commit_marker(&l.text)));
                }
                None => prop_assert!(trace.lines.iter().all(|l| !bank.is_commit_marker(&l.text))),
            }
        }
    }

    #[test]
    fn prop_ranking_is_sorted_and_stable(keys in prop::collection::vec(0u32..50, 0..40)) {
        let items: Vec<(usize, f64)> = keys.iter().enumerate().map(|(i, k)| (i, *k as f64)).collect();
        let ranked = rank_by(items, |(_, k)| *k);

        for (i, r) in ranked.iter().enumerate() {
            prop_assert_eq!(r.rank, i + 1);
        }
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0].item, &pair[1].item);
            prop_assert!(a.1 >= b.1);
            if a.1 == b.1 {
                // Ties keep discovery order
                prop_assert!(a.0 < b.0);
            }
        }
    }
}
