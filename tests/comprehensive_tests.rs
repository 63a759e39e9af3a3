// Comprehensive integration tests for annbench
//
// These drive the library API end-to-end with stub backends:
// - dual-query orchestration, toggles, failures, staleness
// - metric derivation and JSON payload shapes
// - chart projection bounds and tick interpolation
// - classifier precedence over wire-shaped sweep responses
// - report rendering determinism

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serial_test::serial;

use annbench::backend::{
    BackendKind, BenchmarkSummary, QueryBackend, SearchHit, SearchResponse, SweepResponse,
};
use annbench::chart::{project, PlotSample};
use annbench::classify::{classify, Category, ConfigParams, ReferenceSelection};
use annbench::config::Config;
use annbench::metrics::{derive_speedup, Speedup};
use annbench::orchestrator::{BranchOutcome, DualQueryOrchestrator, Toggles};
use annbench::output::JsonDualSearch;
use annbench::report::{render_benchmark_report, render_sweep_report};

// Helper backends

struct EchoBackend {
    time_ms: f64,
    calls: AtomicUsize,
}

impl EchoBackend {
    fn new(time_ms: f64) -> Arc<Self> {
        Arc::new(Self {
            time_ms,
            calls: AtomicUsize::new(0),
        })
    }
}

impl QueryBackend for EchoBackend {
    fn search(&self, query: &str, top_k: usize) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let results = (0..top_k.min(3) as i64)
            .map(|position| SearchHit {
                id: position,
                distance: 0.1 * (position + 1) as f64,
                text: format!("{query} #{position}"),
            })
            .collect();
        Ok(SearchResponse {
            results,
            search_time_ms: Some(self.time_ms),
            recall: None,
        })
    }
}

struct FailingBackend;

impl QueryBackend for FailingBackend {
    fn search(&self, _query: &str, _top_k: usize) -> Result<SearchResponse> {
        Err(anyhow!("connection refused"))
    }
}

/// Blocks each search until the test releases it, so responses can be made
/// to arrive out of submission order.
struct GatedBackend {
    gate: std::sync::Mutex<mpsc::Receiver<()>>,
}

impl GatedBackend {
    fn new() -> (Arc<Self>, mpsc::Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        (
            Arc::new(Self {
                gate: std::sync::Mutex::new(receiver),
            }),
            sender,
        )
    }
}

impl QueryBackend for GatedBackend {
    fn search(&self, query: &str, _top_k: usize) -> Result<SearchResponse> {
        let gate = self.gate.lock().map_err(|_| anyhow!("gate poisoned"))?;
        gate.recv_timeout(Duration::from_secs(5))
            .map_err(|_| anyhow!("gate timed out"))?;
        Ok(SearchResponse {
            results: vec![SearchHit {
                id: 1,
                distance: 0.2,
                text: query.to_string(),
            }],
            search_time_ms: Some(1.0),
            recall: None,
        })
    }
}

fn wire_response(body: &str) -> SearchResponse {
    serde_json::from_str(body).unwrap()
}

// Orchestration

#[test]
fn dual_search_settles_both_branches_and_derives_speedup() {
    let bf = EchoBackend::new(12.0);
    let ivf = EchoBackend::new(2.0);
    let mut orchestrator = DualQueryOrchestrator::new(bf.clone(), ivf.clone());

    let submission = orchestrator.submit("ocean", 10);
    assert_eq!(submission.brute_force, BranchOutcome::Fulfilled);
    assert_eq!(submission.ivf, BranchOutcome::Fulfilled);

    let bf_display = orchestrator.displayed(BackendKind::BruteForce);
    let ivf_display = orchestrator.displayed(BackendKind::Ivf);
    assert_eq!(bf_display.hits.len(), 3);
    assert!(bf_display.hits[0].text.starts_with("ocean"));

    match derive_speedup(bf_display.search_time_ms, ivf_display.search_time_ms) {
        Some(Speedup::Ratio(ratio)) => assert_eq!(ratio, 6.0),
        other => panic!("expected ratio, got {:?}", other),
    }
}

#[test]
fn inactive_backend_gets_no_request_and_empty_display() {
    let bf = EchoBackend::new(12.0);
    let ivf = EchoBackend::new(2.0);
    let mut orchestrator =
        DualQueryOrchestrator::new(bf.clone(), ivf.clone()).with_toggles(Toggles {
            brute_force: true,
            ivf: false,
        });

    let submission = orchestrator.submit("ocean", 10);

    assert_eq!(submission.brute_force, BranchOutcome::Fulfilled);
    assert_eq!(submission.ivf, BranchOutcome::Skipped);
    assert_eq!(ivf.calls.load(Ordering::SeqCst), 0);
    assert!(orchestrator.displayed(BackendKind::Ivf).is_empty());
    assert_eq!(orchestrator.displayed(BackendKind::BruteForce).hits.len(), 3);
}

#[test]
fn one_failing_branch_does_not_block_or_clear_the_other() {
    let bf = EchoBackend::new(12.0);
    let ivf = EchoBackend::new(2.0);
    let mut orchestrator = DualQueryOrchestrator::new(bf, ivf);
    orchestrator.submit("ocean", 10);
    let kept = orchestrator.displayed(BackendKind::Ivf).hits.clone();
    assert!(!kept.is_empty());

    let mut orchestrator = {
        // Fresh orchestrator pair: failing IVF, healthy BF.
        let bf = EchoBackend::new(10.0);
        DualQueryOrchestrator::new(bf, Arc::new(FailingBackend))
    };
    let submission = orchestrator.submit("forest", 10);
    assert_eq!(submission.brute_force, BranchOutcome::Fulfilled);
    match submission.ivf {
        BranchOutcome::Failed(ref message) => assert!(message.contains("connection refused")),
        ref other => panic!("expected failure, got {:?}", other),
    }
    assert!(!orchestrator.displayed(BackendKind::BruteForce).is_empty());
}

#[test]
fn superseded_response_never_overwrites_newer_submission() {
    // "ocean" is submitted first; its response arrives after "forest" was
    // submitted and answered. The display must reflect "forest".
    let bf = EchoBackend::new(1.0);
    let ivf = EchoBackend::new(1.0);
    let mut orchestrator = DualQueryOrchestrator::new(bf, ivf);

    let ocean_generation = orchestrator.begin_submission();
    let forest_generation = orchestrator.begin_submission();

    let forest = orchestrator.apply_outcome(
        BackendKind::BruteForce,
        forest_generation,
        Ok(wire_response(
            r#"{"results": [{"id": 2, "distance": 0.1, "text": "forest"}], "search_time_ms": 1.0}"#,
        )),
    );
    assert_eq!(forest, Some(BranchOutcome::Fulfilled));

    let ocean = orchestrator.apply_outcome(
        BackendKind::BruteForce,
        ocean_generation,
        Ok(wire_response(
            r#"{"results": [{"id": 1, "distance": 0.1, "text": "ocean"}], "search_time_ms": 9.0}"#,
        )),
    );
    assert_eq!(ocean, None, "stale response must be discarded");

    let displayed = orchestrator.displayed(BackendKind::BruteForce);
    assert_eq!(displayed.hits[0].text, "forest");
    assert_eq!(displayed.search_time_ms, Some(1.0));
}

#[test]
fn out_of_order_completion_across_threads_is_discarded() {
    let (gated, release) = GatedBackend::new();
    let bf = EchoBackend::new(1.0);
    let mut orchestrator = DualQueryOrchestrator::new(bf, gated.clone());

    // Open the "ocean" submission and dispatch its IVF branch by hand on a
    // worker thread, holding the response back at the gate.
    let ocean_generation = orchestrator.begin_submission();
    let worker = {
        let gated = gated.clone();
        thread::spawn(move || gated.search("ocean", 5))
    };

    // A newer submission lands and settles first.
    let forest_generation = orchestrator.begin_submission();
    orchestrator.apply_outcome(
        BackendKind::Ivf,
        forest_generation,
        Ok(wire_response(
            r#"{"results": [{"id": 7, "distance": 0.3, "text": "forest"}], "search_time_ms": 2.0}"#,
        )),
    );

    // Now the slow "ocean" response finally arrives.
    release.send(()).unwrap();
    let late = worker.join().unwrap();
    let applied = orchestrator.apply_outcome(BackendKind::Ivf, ocean_generation, late);
    assert_eq!(applied, None);
    assert_eq!(orchestrator.displayed(BackendKind::Ivf).hits[0].text, "forest");
}

// Metrics + JSON output

#[test]
fn speedup_edge_cases_follow_the_contract() {
    assert_eq!(derive_speedup(None, Some(2.0)), None);
    assert_eq!(derive_speedup(Some(2.0), None), None);
    assert_eq!(derive_speedup(Some(0.0), Some(2.0)), None);
    assert_eq!(
        derive_speedup(Some(0.0), Some(0.0)),
        Some(Speedup::NoMeasurableDifference)
    );
    match derive_speedup(Some(9.0), Some(4.5)) {
        Some(Speedup::Ratio(ratio)) => assert_eq!(ratio, 2.0),
        other => panic!("expected ratio, got {:?}", other),
    }
}

#[test]
fn json_payload_reflects_submission_outcomes() {
    let bf = EchoBackend::new(8.0);
    let mut orchestrator = DualQueryOrchestrator::new(bf, Arc::new(FailingBackend));
    let submission = orchestrator.submit("ocean", 5);

    let bf_display = orchestrator.displayed(BackendKind::BruteForce);
    let ivf_display = orchestrator.displayed(BackendKind::Ivf);
    let payload = JsonDualSearch::from_submission(
        "ocean",
        5,
        Duration::from_millis(9),
        &submission,
        bf_display,
        ivf_display,
        derive_speedup(bf_display.search_time_ms, ivf_display.search_time_ms),
    );

    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["brute_force"]["status"], "fulfilled");
    assert_eq!(value["ivf"]["status"], "failed");
    // IVF never answered, so no speedup may be reported.
    assert_eq!(value["speedup_x"], serde_json::Value::Null);
    assert_eq!(value["no_measurable_difference"], false);
}

// Chart projection

#[test]
fn projection_bounds_hold_for_non_degenerate_input() {
    let samples = [
        PlotSample {
            latency_ms: Some(2.0),
            recall: Some(0.70),
        },
        PlotSample {
            latency_ms: Some(9.0),
            recall: Some(0.99),
        },
    ];
    let projection = project(&samples).unwrap();
    let bounds = projection.bounds;

    assert!(bounds.min_recall >= 0.0);
    assert!(bounds.max_recall <= 1.0);
    assert!(bounds.min_latency >= 0.0);
    assert!(bounds.min_latency < bounds.max_latency);
    assert!(bounds.min_recall < bounds.max_recall);

    // Ticks interpolate the padded range exactly.
    for (position, tick) in projection.latency_ticks.iter().enumerate() {
        let expected =
            bounds.min_latency + (bounds.max_latency - bounds.min_latency) * position as f64 / 4.0;
        assert!((tick - expected).abs() < 1e-9);
    }
}

#[test]
fn projection_absent_for_empty_measurement_set() {
    assert!(project(&[]).is_none());
}

// Classifier over wire-shaped data

#[test]
fn sweep_classification_scenario_from_wire_json() {
    let body = r#"{
        "results": [
            {"nlist": 4, "nprobe": 1, "mean_recall": 0.70, "mean_latency_ms": 2.0, "speedup": 8.0},
            {"nlist": 64, "nprobe": 16, "mean_recall": 0.99, "mean_latency_ms": 9.0, "speedup": 1.1}
        ],
        "best_recall": {"nlist": 64, "nprobe": 16, "mean_recall": 0.99, "mean_latency_ms": 9.0, "speedup": 1.1},
        "best_latency": {"nlist": 4, "nprobe": 1, "mean_recall": 0.70, "mean_latency_ms": 2.0, "speedup": 8.0}
    }"#;
    let response: SweepResponse = serde_json::from_str(body).unwrap();
    let refs = ReferenceSelection::from_response(&response);

    let categories: Vec<Category> = response
        .results
        .iter()
        .map(|point| classify(ConfigParams::of(point), &refs))
        .collect();
    assert_eq!(categories, vec![Category::BestLatency, Category::BestRecall]);
}

#[test]
fn classifier_precedence_when_one_config_wins_twice() {
    let shared = ConfigParams {
        nlist: 32,
        nprobe: 8,
    };
    let refs = ReferenceSelection {
        best_recall: Some(shared),
        best_speedup: Some(shared),
        best_latency: None,
        best_balanced: None,
    };
    assert_eq!(classify(shared, &refs), Category::BestRecall);
}

// Reports

#[test]
fn benchmark_report_from_wire_json_is_stable() {
    let body = r#"{
        "num_queries": 2,
        "mean_recall": 0.95,
        "median_recall": 0.95,
        "min_recall": 0.9,
        "max_recall": 1.0,
        "stddev_recall": 0.05,
        "mean_speedup": 5.0,
        "results": [
            {"query": "ocean", "recall_at_k": 1.0, "speedup_x": 6.1, "bf_time_ms": 12.0, "ivf_time_ms": 1.97},
            {"query": "forest", "recall_at_k": 0.9, "speedup_x": 4.1, "bf_time_ms": 10.0, "ivf_time_ms": 2.4}
        ]
    }"#;
    let summary: BenchmarkSummary = serde_json::from_str(body).unwrap();

    let first = render_benchmark_report(&summary, 10);
    let second = render_benchmark_report(&summary, 10);
    assert_eq!(first, second);
    assert!(first.contains("Mean Recall:     95.00%"));
    assert!(first.contains("• ocean"));
    assert!(first.contains("BF: 12.00ms | IVF: 1.97ms"));
}

#[test]
fn sweep_report_from_sparse_wire_json_never_fails() {
    // Absent metrics fall back to zero in the rendered report.
    let body = r#"{"results": [{"nlist": 8, "nprobe": 2}]}"#;
    let response: SweepResponse = serde_json::from_str(body).unwrap();
    let report = render_sweep_report(&response, 10);
    assert!(report.contains("• nlist=8 nprobe=2"));
    assert!(report.contains("Recall: 0.00% | Speedup: 0.00x | Latency: 0.00ms"));
    assert!(report.contains("Best Recall:     (none)"));
}

// Configuration

#[test]
#[serial]
fn config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("config.toml");
    std::fs::write(
        &config_file,
        "[server]\nbase_url = \"http://bench:8080\"\ntimeout_secs = 7\n",
    )
    .unwrap();
    std::env::set_var("ANNBENCH_CONFIG", &config_file);

    let config = Config::load().unwrap();
    assert_eq!(config.server.base_url, "http://bench:8080");
    assert_eq!(config.server.timeout_secs, 7);

    std::env::remove_var("ANNBENCH_CONFIG");
}
