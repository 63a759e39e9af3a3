//! Structured JSON payloads for `--json` output.

use std::time::Duration;

use serde::Serialize;

use crate::backend::{
    BackendKind, BenchmarkSummary, IndexStatus, SearchHit, SweepPoint, SweepResponse,
};
use crate::classify::{classify, ConfigParams, ReferenceSelection};
use crate::metrics::Speedup;
use crate::orchestrator::{BranchOutcome, DisplayedResults, Submission};

#[derive(Serialize)]
pub struct JsonBackendResult {
    pub backend: &'static str,
    pub status: &'static str,
    pub error: Option<String>,
    pub search_time_ms: Option<f64>,
    pub recall: Option<f64>,
    pub results: Vec<SearchHit>,
}

impl JsonBackendResult {
    fn new(kind: BackendKind, outcome: &BranchOutcome, displayed: &DisplayedResults) -> Self {
        let (status, error) = match outcome {
            BranchOutcome::Fulfilled => ("fulfilled", None),
            BranchOutcome::Skipped => ("skipped", None),
            BranchOutcome::Failed(message) => ("failed", Some(message.clone())),
        };
        Self {
            backend: kind.label(),
            status,
            error,
            search_time_ms: displayed.search_time_ms,
            recall: displayed.recall,
            results: displayed.hits.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct JsonDualSearch {
    pub query: String,
    pub top_k: usize,
    pub duration_ms: u128,
    pub brute_force: JsonBackendResult,
    pub ivf: JsonBackendResult,
    /// Exact-over-clustered latency ratio; absent when underived.
    pub speedup_x: Option<f64>,
    /// Both sides reported exactly 0ms.
    pub no_measurable_difference: bool,
}

impl JsonDualSearch {
    #[allow(clippy::too_many_arguments)]
    pub fn from_submission(
        query: &str,
        top_k: usize,
        duration: Duration,
        submission: &Submission,
        bf_displayed: &DisplayedResults,
        ivf_displayed: &DisplayedResults,
        speedup: Option<Speedup>,
    ) -> Self {
        let (speedup_x, no_measurable_difference) = match speedup {
            Some(Speedup::Ratio(ratio)) => (Some(ratio), false),
            Some(Speedup::NoMeasurableDifference) => (None, true),
            None => (None, false),
        };
        Self {
            query: query.to_string(),
            top_k,
            duration_ms: duration.as_millis(),
            brute_force: JsonBackendResult::new(
                BackendKind::BruteForce,
                &submission.brute_force,
                bf_displayed,
            ),
            ivf: JsonBackendResult::new(BackendKind::Ivf, &submission.ivf, ivf_displayed),
            speedup_x,
            no_measurable_difference,
        }
    }
}

#[derive(Serialize)]
pub struct JsonBenchmark {
    pub top_k: usize,
    #[serde(flatten)]
    pub summary: BenchmarkSummary,
}

#[derive(Serialize)]
pub struct JsonSweepRow {
    #[serde(flatten)]
    pub point: SweepPoint,
    pub category: &'static str,
}

#[derive(Serialize)]
pub struct JsonSweep {
    pub top_k: usize,
    pub results: Vec<JsonSweepRow>,
    pub best_recall: Option<SweepPoint>,
    pub best_speedup: Option<SweepPoint>,
    pub best_latency: Option<SweepPoint>,
    pub best_balanced: Option<SweepPoint>,
}

impl JsonSweep {
    pub fn from_response(response: &SweepResponse, top_k: usize) -> Self {
        let refs = ReferenceSelection::from_response(response);
        let results = response
            .results
            .iter()
            .map(|point| JsonSweepRow {
                point: point.clone(),
                category: classify(ConfigParams::of(point), &refs).label(),
            })
            .collect();
        Self {
            top_k,
            results,
            best_recall: response.best_recall.clone(),
            best_speedup: response.best_speedup.clone(),
            best_latency: response.best_latency.clone(),
            best_balanced: response.best_balanced.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct JsonStatus {
    #[serde(flatten)]
    pub status: IndexStatus,
}
