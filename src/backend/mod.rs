//! Wire types for the search backend HTTP contract.
//!
//! Both indexes live behind one service; each exposes its own query endpoint
//! plus shared benchmark, sweep, status and ingest endpoints. All payloads
//! are JSON, stateless per call, with no streaming. Optional response fields
//! tolerate absence via defaults; a sparse but successful response is never
//! an error.

use anyhow::Result;
use serde::{Deserialize, Serialize};

mod http;

pub use http::{ApiClient, HttpSearcher};

/// Which of the two indexes a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Exact brute-force scan over the whole store.
    BruteForce,
    /// Clustered (inverted-file) approximate index.
    Ivf,
}

impl BackendKind {
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::BruteForce => "BruteForce",
            BackendKind::Ivf => "IVF",
        }
    }

    pub fn search_path(&self) -> &'static str {
        match self {
            BackendKind::BruteForce => "/bf_search",
            BackendKind::Ivf => "/ivf_search",
        }
    }
}

/// A single ranked hit returned by either index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub distance: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub top_k: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub search_time_ms: Option<f64>,
    /// Recall against the exact index, when the backend tracked it.
    #[serde(default)]
    pub recall: Option<f64>,
}

#[derive(Serialize)]
pub struct BenchmarkRequest {
    pub num_queries: usize,
    pub queries: Vec<String>,
    pub top_k: usize,
}

/// Per-query benchmark measurement. Identifying parameter: the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryMeasurement {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub recall_at_k: Option<f64>,
    #[serde(default)]
    pub speedup_x: Option<f64>,
    #[serde(default)]
    pub bf_time_ms: Option<f64>,
    #[serde(default)]
    pub ivf_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    #[serde(default)]
    pub num_queries: usize,
    #[serde(default)]
    pub mean_recall: Option<f64>,
    #[serde(default)]
    pub median_recall: Option<f64>,
    #[serde(default)]
    pub min_recall: Option<f64>,
    #[serde(default)]
    pub max_recall: Option<f64>,
    #[serde(default)]
    pub stddev_recall: Option<f64>,
    #[serde(default)]
    pub mean_speedup: Option<f64>,
    #[serde(default)]
    pub results: Vec<QueryMeasurement>,
}

#[derive(Serialize)]
pub struct SweepRequest {
    pub nlist_values: Vec<u32>,
    pub nprobe_values: Vec<u32>,
    pub queries: Vec<String>,
    pub top_k: usize,
}

/// One swept configuration. Identifying parameters: `(nlist, nprobe)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepPoint {
    pub nlist: u32,
    pub nprobe: u32,
    #[serde(default)]
    pub mean_recall: Option<f64>,
    #[serde(default)]
    pub mean_latency_ms: Option<f64>,
    #[serde(default)]
    pub speedup: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResponse {
    #[serde(default)]
    pub results: Vec<SweepPoint>,
    #[serde(default)]
    pub best_recall: Option<SweepPoint>,
    #[serde(default)]
    pub best_speedup: Option<SweepPoint>,
    #[serde(default)]
    pub best_latency: Option<SweepPoint>,
    #[serde(default)]
    pub best_balanced: Option<SweepPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatIndexStatus {
    #[serde(default)]
    pub initialized: bool,
    #[serde(default, rename = "vectorCount")]
    pub vector_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusteredIndexStatus {
    #[serde(default)]
    pub initialized: bool,
    #[serde(default, rename = "vectorCount")]
    pub vector_count: u64,
    #[serde(default)]
    pub nlist: u32,
    #[serde(default)]
    pub nprobe: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub bf: FlatIndexStatus,
    #[serde(default)]
    pub ivf: ClusteredIndexStatus,
}

#[derive(Serialize)]
pub struct AddBatchRequest {
    pub batch: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBatchResponse {
    #[serde(default)]
    pub added: Vec<i64>,
}

/// Seam between the orchestrator and a concrete index endpoint. Lets tests
/// drive the orchestrator with in-process stubs instead of a live service.
pub trait QueryBackend: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Result<SearchResponse>;
}
