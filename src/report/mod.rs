//! Clipboard-ready text reports for benchmark and sweep results.
//!
//! The layout is fixed: a title over a heavy rule, sections over light rules,
//! aligned `key: value` lines, then a bulleted per-item enumeration. Identical
//! input yields byte-identical output, and rendering never fails: absent
//! sections come out empty rather than being dropped.

use std::fmt::Write as _;

use crate::backend::{BenchmarkSummary, SweepResponse};
use crate::classify::{classify, Category, ConfigParams, ReferenceSelection};

const HEAVY_RULE: &str = "════════════════════════════════════════";
const LIGHT_RULE: &str = "────────────────────────────────────────";
const LABEL_WIDTH: usize = 17;

/// Format a recall/ratio as a percentage with two decimals.
///
/// An absent value renders as `0.00%`, which is indistinguishable from a
/// genuine zero measurement. That matches the established report format and
/// is kept as a known display-only approximation.
fn fmt_pct(value: Option<f64>) -> String {
    format!("{:.2}%", value.unwrap_or(0.0) * 100.0)
}

/// Milliseconds with two decimals; absent renders as `0.00ms` (see
/// [`fmt_pct`] for the rationale).
fn fmt_ms(value: Option<f64>) -> String {
    format!("{:.2}ms", value.unwrap_or(0.0))
}

/// Bare multiplier with two decimals; absent renders as `0.00x` (see
/// [`fmt_pct`] for the rationale).
fn fmt_mult(value: Option<f64>) -> String {
    format!("{:.2}x", value.unwrap_or(0.0))
}

fn kv(out: &mut String, label: &str, value: impl AsRef<str>) {
    let _ = writeln!(out, "{:<LABEL_WIDTH$}{}", label, value.as_ref());
}

fn section(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(LIGHT_RULE);
    out.push('\n');
}

/// Render the aggregate benchmark report.
pub fn render_benchmark_report(summary: &BenchmarkSummary, top_k: usize) -> String {
    let mut out = String::new();

    out.push_str("Benchmark Results\n");
    out.push_str(HEAVY_RULE);
    out.push_str("\n\n");

    section(&mut out, "Summary");
    kv(&mut out, "Queries Tested:", summary.num_queries.to_string());
    kv(&mut out, "Top K:", top_k.to_string());
    out.push('\n');

    section(&mut out, "Recall@k Statistics");
    kv(&mut out, "Mean Recall:", fmt_pct(summary.mean_recall));
    kv(&mut out, "Median Recall:", fmt_pct(summary.median_recall));
    kv(&mut out, "Min Recall:", fmt_pct(summary.min_recall));
    kv(&mut out, "Max Recall:", fmt_pct(summary.max_recall));
    kv(
        &mut out,
        "Std Dev:",
        format!("±{}", fmt_pct(summary.stddev_recall)),
    );
    out.push('\n');

    section(&mut out, "Performance");
    kv(&mut out, "Mean Speedup:", fmt_mult(summary.mean_speedup));
    out.push('\n');

    section(&mut out, "Individual Results");
    for result in &summary.results {
        let _ = writeln!(out, "• {}", result.query);
        let _ = writeln!(
            out,
            "  Recall: {} | Speedup: {} | BF: {} | IVF: {}",
            fmt_pct(result.recall_at_k),
            fmt_mult(result.speedup_x),
            fmt_ms(result.bf_time_ms),
            fmt_ms(result.ivf_time_ms),
        );
    }

    out.trim().to_string()
}

fn fmt_params(params: Option<ConfigParams>) -> String {
    match params {
        Some(p) => format!("nlist={} nprobe={}", p.nlist, p.nprobe),
        None => "(none)".to_string(),
    }
}

/// Render the parameter-sweep report, badging each configuration with its
/// classified category.
pub fn render_sweep_report(response: &SweepResponse, top_k: usize) -> String {
    let refs = ReferenceSelection::from_response(response);
    let mut out = String::new();

    out.push_str("Parameter Sweep Results\n");
    out.push_str(HEAVY_RULE);
    out.push_str("\n\n");

    section(&mut out, "Summary");
    kv(&mut out, "Configurations:", response.results.len().to_string());
    kv(&mut out, "Top K:", top_k.to_string());
    out.push('\n');

    section(&mut out, "Reference Points");
    kv(&mut out, "Best Recall:", fmt_params(refs.best_recall));
    kv(&mut out, "Best Speedup:", fmt_params(refs.best_speedup));
    kv(&mut out, "Best Latency:", fmt_params(refs.best_latency));
    kv(&mut out, "Best Balanced:", fmt_params(refs.best_balanced));
    out.push('\n');

    section(&mut out, "Configurations");
    for point in &response.results {
        let params = ConfigParams::of(point);
        match classify(params, &refs) {
            Category::Ordinary => {
                let _ = writeln!(out, "• nlist={} nprobe={}", point.nlist, point.nprobe);
            }
            category => {
                let _ = writeln!(
                    out,
                    "• nlist={} nprobe={} [{}]",
                    point.nlist,
                    point.nprobe,
                    category.label()
                );
            }
        }
        let _ = writeln!(
            out,
            "  Recall: {} | Speedup: {} | Latency: {}",
            fmt_pct(point.mean_recall),
            fmt_mult(point.speedup),
            fmt_ms(point.mean_latency_ms),
        );
    }

    out.trim().to_string()
}
