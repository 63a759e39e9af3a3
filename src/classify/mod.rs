//! Categorizes swept index configurations against backend-chosen reference
//! points.
//!
//! The sweep endpoint nominates up to four "best" configurations (highest
//! recall, highest speedup, lowest latency, best balance). A configuration can
//! be nominated on more than one axis; display still wants a single badge per
//! row, so classification applies a fixed precedence. No searching or scoring
//! happens here; the reference points arrive from the backend as-is.

use serde::{Deserialize, Serialize};

use crate::backend::SweepPoint;

/// Identifying parameters of one clustered-index configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigParams {
    pub nlist: u32,
    pub nprobe: u32,
}

impl ConfigParams {
    pub fn of(point: &SweepPoint) -> Self {
        Self {
            nlist: point.nlist,
            nprobe: point.nprobe,
        }
    }
}

/// The backend's nominated reference configurations, keyed by parameters
/// only. Metric values play no part in matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceSelection {
    pub best_recall: Option<ConfigParams>,
    pub best_speedup: Option<ConfigParams>,
    pub best_latency: Option<ConfigParams>,
    pub best_balanced: Option<ConfigParams>,
}

impl ReferenceSelection {
    pub fn from_response(response: &crate::backend::SweepResponse) -> Self {
        Self {
            best_recall: response.best_recall.as_ref().map(ConfigParams::of),
            best_speedup: response.best_speedup.as_ref().map(ConfigParams::of),
            best_latency: response.best_latency.as_ref().map(ConfigParams::of),
            best_balanced: response.best_balanced.as_ref().map(ConfigParams::of),
        }
    }
}

/// The single category a configuration lands in. Every configuration gets
/// exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    BestRecall,
    BestSpeedup,
    BestLatency,
    BestBalanced,
    Ordinary,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::BestRecall => "best recall",
            Category::BestSpeedup => "best speedup",
            Category::BestLatency => "best latency",
            Category::BestBalanced => "best balanced",
            Category::Ordinary => "ordinary",
        }
    }

    /// Scatter-plot marker for this category.
    pub fn marker(&self) -> char {
        match self {
            Category::BestRecall => 'R',
            Category::BestSpeedup => 'S',
            Category::BestLatency => 'L',
            Category::BestBalanced => 'B',
            Category::Ordinary => '*',
        }
    }
}

/// Decision table ordered by precedence: a configuration nominated on several
/// axes keeps the first matching slot.
const PRECEDENCE: [(fn(&ReferenceSelection) -> Option<ConfigParams>, Category); 4] = [
    (|refs| refs.best_recall, Category::BestRecall),
    (|refs| refs.best_speedup, Category::BestSpeedup),
    (|refs| refs.best_latency, Category::BestLatency),
    (|refs| refs.best_balanced, Category::BestBalanced),
];

/// Classify one configuration. Matching is full parameter equality; the
/// result is total; configurations matching no slot are `Ordinary`.
pub fn classify(params: ConfigParams, refs: &ReferenceSelection) -> Category {
    PRECEDENCE
        .iter()
        .find(|(slot, _)| (slot)(refs) == Some(params))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Ordinary)
}
