//! Dispatches one query to both indexes and reconciles the outcomes.
//!
//! Each submission fans out to the active backends on scoped worker threads
//! and settles only once both branches resolve: a join, not a race. The
//! orchestrator is the sole owner of the displayed per-backend state, and a
//! branch outcome is committed only while its submission is still the newest
//! one: a slow response from a superseded submission is discarded, never
//! applied over fresher results.

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use tracing::{debug, warn};

use crate::backend::{BackendKind, QueryBackend, SearchHit, SearchResponse};

/// What one backend currently shows. Cleared (not errored) when the backend
/// is toggled off; left untouched when a request for it fails.
#[derive(Debug, Clone, Default)]
pub struct DisplayedResults {
    pub hits: Vec<SearchHit>,
    pub search_time_ms: Option<f64>,
    pub recall: Option<f64>,
}

impl DisplayedResults {
    fn from_response(response: SearchResponse) -> Self {
        Self {
            hits: response.results,
            search_time_ms: response.search_time_ms,
            recall: response.recall,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.search_time_ms.is_none()
    }
}

/// Terminal state of one backend's branch within a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    /// The backend answered and its displayed results were replaced.
    Fulfilled,
    /// The backend was toggled off; no request was sent and its display was
    /// cleared.
    Skipped,
    /// The request failed; the previously displayed results stand.
    Failed(String),
}

/// Which backends participate in submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub brute_force: bool,
    pub ivf: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            brute_force: true,
            ivf: true,
        }
    }
}

impl Toggles {
    fn is_active(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::BruteForce => self.brute_force,
            BackendKind::Ivf => self.ivf,
        }
    }
}

/// A settled submission: both branches have resolved.
#[derive(Debug)]
pub struct Submission {
    pub generation: u64,
    pub brute_force: BranchOutcome,
    pub ivf: BranchOutcome,
}

pub struct DualQueryOrchestrator {
    brute_force: Arc<dyn QueryBackend>,
    ivf: Arc<dyn QueryBackend>,
    toggles: Toggles,
    generation: u64,
    bf_display: DisplayedResults,
    ivf_display: DisplayedResults,
}

impl DualQueryOrchestrator {
    pub fn new(brute_force: Arc<dyn QueryBackend>, ivf: Arc<dyn QueryBackend>) -> Self {
        Self {
            brute_force,
            ivf,
            toggles: Toggles::default(),
            generation: 0,
            bf_display: DisplayedResults::default(),
            ivf_display: DisplayedResults::default(),
        }
    }

    pub fn with_toggles(mut self, toggles: Toggles) -> Self {
        self.toggles = toggles;
        self
    }

    pub fn toggles(&self) -> Toggles {
        self.toggles
    }

    pub fn set_active(&mut self, kind: BackendKind, active: bool) {
        match kind {
            BackendKind::BruteForce => self.toggles.brute_force = active,
            BackendKind::Ivf => self.toggles.ivf = active,
        }
    }

    pub fn displayed(&self, kind: BackendKind) -> &DisplayedResults {
        match kind {
            BackendKind::BruteForce => &self.bf_display,
            BackendKind::Ivf => &self.ivf_display,
        }
    }

    fn display_mut(&mut self, kind: BackendKind) -> &mut DisplayedResults {
        match kind {
            BackendKind::BruteForce => &mut self.bf_display,
            BackendKind::Ivf => &mut self.ivf_display,
        }
    }

    /// Open a new submission: bump the generation marker and clear the
    /// display of every inactive backend. Responses from earlier generations
    /// become stale from this point on.
    pub fn begin_submission(&mut self) -> u64 {
        self.generation += 1;
        for kind in [BackendKind::BruteForce, BackendKind::Ivf] {
            if !self.toggles.is_active(kind) {
                *self.display_mut(kind) = DisplayedResults::default();
            }
        }
        debug!("generation" = self.generation, "msg" = "submission opened");
        self.generation
    }

    /// Commit one branch's result, provided its submission is still the
    /// newest. Returns `None` when the result was stale and discarded.
    pub fn apply_outcome(
        &mut self,
        kind: BackendKind,
        generation: u64,
        result: Result<SearchResponse>,
    ) -> Option<BranchOutcome> {
        if generation != self.generation {
            warn!(
                "backend" = kind.label(),
                "generation" = generation,
                "current" = self.generation,
                "msg" = "discarding stale backend response"
            );
            return None;
        }
        Some(match result {
            Ok(response) => {
                *self.display_mut(kind) = DisplayedResults::from_response(response);
                BranchOutcome::Fulfilled
            }
            Err(err) => BranchOutcome::Failed(format!("{err:#}")),
        })
    }

    fn settle(
        &mut self,
        kind: BackendKind,
        generation: u64,
        joined: Option<thread::Result<Result<SearchResponse>>>,
    ) -> BranchOutcome {
        match joined {
            None => BranchOutcome::Skipped,
            Some(Err(_)) => BranchOutcome::Failed("search worker panicked".to_string()),
            Some(Ok(result)) => self
                .apply_outcome(kind, generation, result)
                .unwrap_or_else(|| {
                    BranchOutcome::Failed("superseded by a newer submission".to_string())
                }),
        }
    }

    /// Submit a query to every active backend and wait for both branches to
    /// resolve. The two requests run concurrently; display state is written
    /// only here, after the join, so no locking is needed.
    pub fn submit(&mut self, query: &str, top_k: usize) -> Submission {
        let generation = self.begin_submission();
        let toggles = self.toggles;
        let brute_force = Arc::clone(&self.brute_force);
        let ivf = Arc::clone(&self.ivf);

        let (bf_joined, ivf_joined) = thread::scope(|scope| {
            let bf_handle = toggles
                .brute_force
                .then(|| scope.spawn(|| brute_force.search(query, top_k)));
            let ivf_handle = toggles
                .ivf
                .then(|| scope.spawn(|| ivf.search(query, top_k)));
            (
                bf_handle.map(|handle| handle.join()),
                ivf_handle.map(|handle| handle.join()),
            )
        });

        Submission {
            generation,
            brute_force: self.settle(BackendKind::BruteForce, generation, bf_joined),
            ivf: self.settle(BackendKind::Ivf, generation, ivf_joined),
        }
    }
}
