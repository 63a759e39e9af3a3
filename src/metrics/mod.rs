//! Derived comparison metrics from backend-reported timings.
//!
//! The backends report wall-clock search times; everything here is purely
//! derived from those readings and carries no error state of its own. An
//! absent input always produces an absent output.

/// Outcome of comparing the two backends' timings for the same query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Speedup {
    /// Exact-backend time divided by clustered-backend time. A ratio above
    /// 1.0 means the clustered index answered faster.
    Ratio(f64),
    /// Both backends reported exactly 0ms. There is nothing meaningful to
    /// divide, so we report "no measurable difference" instead of a ratio.
    NoMeasurableDifference,
}

impl Speedup {
    /// Whether the clustered backend was the faster one. `None` when the
    /// timings were indistinguishable.
    pub fn clustered_is_faster(&self) -> Option<bool> {
        match self {
            Speedup::Ratio(ratio) => Some(*ratio > 1.0),
            Speedup::NoMeasurableDifference => None,
        }
    }
}

/// Derive the speedup of the clustered backend relative to the exact one.
///
/// Returns `None` unless both timings are present: a missing reading must
/// never be coerced to 0 or infinity. When exactly one side reads 0ms the
/// ratio would be degenerate, so that also yields `None`.
pub fn derive_speedup(exact_ms: Option<f64>, clustered_ms: Option<f64>) -> Option<Speedup> {
    match (exact_ms, clustered_ms) {
        (Some(exact), Some(clustered)) if exact == 0.0 && clustered == 0.0 => {
            Some(Speedup::NoMeasurableDifference)
        }
        (Some(exact), Some(clustered)) if exact != 0.0 && clustered != 0.0 => {
            Some(Speedup::Ratio(exact / clustered))
        }
        _ => None,
    }
}
