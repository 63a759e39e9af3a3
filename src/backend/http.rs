//! ureq transport for the backend HTTP contract.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    AddBatchRequest, AddBatchResponse, BackendKind, BenchmarkRequest, BenchmarkSummary,
    IndexStatus, QueryBackend, SearchRequest, SearchResponse, SweepRequest, SweepResponse,
};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client for the backend service hosting both indexes.
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(if timeout_secs == 0 {
                DEFAULT_TIMEOUT_SECS
            } else {
                timeout_secs
            }))
            .build();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post_json<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .post(&url)
            .send_json(body)
            .map_err(|err| request_error(path, err))?;
        response
            .into_json()
            .with_context(|| format!("Failed to parse backend response from {path}"))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| request_error(path, err))?;
        response
            .into_json()
            .with_context(|| format!("Failed to parse backend response from {path}"))
    }

    pub fn search(&self, kind: BackendKind, query: &str, top_k: usize) -> Result<SearchResponse> {
        self.post_json(kind.search_path(), &SearchRequest { query, top_k })
    }

    pub fn benchmark(&self, queries: Vec<String>, top_k: usize) -> Result<BenchmarkSummary> {
        let request = BenchmarkRequest {
            num_queries: queries.len(),
            queries,
            top_k,
        };
        self.post_json("/benchmark", &request)
    }

    pub fn sweep(&self, request: &SweepRequest) -> Result<SweepResponse> {
        self.post_json("/ivf_param_sweep", request)
    }

    pub fn index_status(&self) -> Result<IndexStatus> {
        self.get_json("/index_status")
    }

    pub fn add_batch(&self, batch: Vec<String>) -> Result<AddBatchResponse> {
        self.post_json("/vector_store/add_batch", &AddBatchRequest { batch })
    }

    /// A [`QueryBackend`] view of one index behind this client.
    pub fn searcher(&self, kind: BackendKind) -> HttpSearcher {
        HttpSearcher {
            client: self.clone(),
            kind,
        }
    }
}

/// Map a ureq error to a message the user can act on. Non-success responses
/// keep the backend's own body text when there is one.
fn request_error(path: &str, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(status, response) => match response.into_string() {
            Ok(body) if !body.trim().is_empty() => {
                anyhow!("Backend returned {status} for {path}: {}", body.trim())
            }
            _ => anyhow!("Backend request to {path} failed with status {status}"),
        },
        ureq::Error::Transport(transport) => {
            anyhow!("Failed to reach backend at {path}: {transport}")
        }
    }
}

/// One index endpoint behind the shared client.
#[derive(Clone)]
pub struct HttpSearcher {
    client: ApiClient,
    kind: BackendKind,
}

impl QueryBackend for HttpSearcher {
    fn search(&self, query: &str, top_k: usize) -> Result<SearchResponse> {
        self.client.search(self.kind, query, top_k)
    }
}
