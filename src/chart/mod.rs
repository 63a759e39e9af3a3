//! Projects recall/latency measurements into a padded 2-D plot space.
//!
//! The projection is ephemeral: it is recomputed from the current measurement
//! set on every render and never stored. Samples missing a component still
//! appear in tables and reports; they are only excluded from the point list.

/// One measurement as the chart sees it: a latency/recall pair where either
/// component may not have been measured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlotSample {
    pub latency_ms: Option<f64>,
    pub recall: Option<f64>,
}

/// Padded bounding box of the plot space. Recall bounds stay inside [0, 1]
/// and the latency lower bound never dips below 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub min_latency: f64,
    pub max_latency: f64,
    pub min_recall: f64,
    pub max_recall: f64,
}

/// A sample's normalized position inside the padded bounds. `index` refers
/// back into the input slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotProjection {
    pub bounds: PlotBounds,
    pub points: Vec<PlotPoint>,
    pub latency_ticks: [f64; 5],
    pub recall_ticks: [f64; 5],
}

const PAD_FRACTION: f64 = 0.10;
/// Absolute padding substituted when all latencies are identical.
const MIN_LATENCY_PAD_MS: f64 = 0.1;
/// Absolute padding substituted when all recalls are identical.
const MIN_RECALL_PAD: f64 = 0.05;

const TICK_FRACTIONS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

fn axis_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;
    for value in values {
        range = Some(match range {
            None => (value, value),
            Some((min, max)) => (min.min(value), max.max(value)),
        });
    }
    range
}

fn pad(min: f64, max: f64, min_pad: f64) -> (f64, f64) {
    let span = max - min;
    let pad = if span == 0.0 { min_pad } else { span * PAD_FRACTION };
    (min - pad, max + pad)
}

fn ticks(min: f64, max: f64) -> [f64; 5] {
    // Exact linear interpolation over the padded range, never sampled from
    // the data itself.
    TICK_FRACTIONS.map(|fraction| min + (max - min) * fraction)
}

/// Project a measurement set into normalized plot coordinates.
///
/// Returns `None` when the set is empty or neither axis has a measured value,
/// so the caller can render a neutral empty state instead of a degenerate
/// chart.
pub fn project(samples: &[PlotSample]) -> Option<PlotProjection> {
    let (min_latency, max_latency) =
        axis_range(samples.iter().filter_map(|sample| sample.latency_ms))?;
    let (min_recall, max_recall) = axis_range(samples.iter().filter_map(|sample| sample.recall))?;

    let (min_latency, max_latency) = pad(min_latency, max_latency, MIN_LATENCY_PAD_MS);
    let (min_recall, max_recall) = pad(min_recall, max_recall, MIN_RECALL_PAD);

    let bounds = PlotBounds {
        min_latency: min_latency.max(0.0),
        max_latency,
        min_recall: min_recall.max(0.0),
        max_recall: max_recall.min(1.0),
    };

    let latency_span = bounds.max_latency - bounds.min_latency;
    let recall_span = bounds.max_recall - bounds.min_recall;

    let points = samples
        .iter()
        .enumerate()
        .filter_map(|(index, sample)| {
            let latency = sample.latency_ms?;
            let recall = sample.recall?;
            Some(PlotPoint {
                index,
                x: (latency - bounds.min_latency) / latency_span,
                y: (recall - bounds.min_recall) / recall_span,
            })
        })
        .collect();

    Some(PlotProjection {
        bounds,
        points,
        latency_ticks: ticks(bounds.min_latency, bounds.max_latency),
        recall_ticks: ticks(bounds.min_recall, bounds.max_recall),
    })
}

impl PlotProjection {
    /// Render the projection as a fixed-size ASCII scatter grid with recall
    /// on the vertical axis and latency on the horizontal one. `markers`
    /// supplies a glyph per sample index; unsupplied indexes fall back to `*`.
    pub fn render_scatter(&self, width: usize, height: usize, markers: &[char]) -> String {
        let width = width.max(20);
        let height = height.max(5);
        let mut grid = vec![vec![' '; width]; height];

        for point in &self.points {
            let col = (point.x * (width - 1) as f64).round() as usize;
            let row = ((1.0 - point.y) * (height - 1) as f64).round() as usize;
            let marker = markers.get(point.index).copied().unwrap_or('*');
            grid[row.min(height - 1)][col.min(width - 1)] = marker;
        }

        let tick_rows: Vec<usize> = TICK_FRACTIONS
            .iter()
            .map(|fraction| (fraction * (height - 1) as f64).round() as usize)
            .collect();

        let mut out = String::new();
        for (row, cells) in grid.iter().enumerate() {
            // Vertical tick labels run from max recall at the top down.
            let label = match tick_rows.iter().position(|&tick| tick == row) {
                Some(position) => format!("{:>7.3}", self.recall_ticks[4 - position]),
                None => " ".repeat(7),
            };
            out.push_str(&label);
            out.push_str(" |");
            let line: String = cells.iter().collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }

        out.push_str(&" ".repeat(7));
        out.push_str(" +");
        out.push_str(&"-".repeat(width));
        out.push('\n');

        let mut axis = vec![' '; width + 9];
        for (position, fraction) in TICK_FRACTIONS.iter().enumerate() {
            let text = format!("{:.2}", self.latency_ticks[position]);
            let col = 9 + (fraction * (width - 1) as f64).round() as usize;
            let start = col.min(width + 9 - text.len());
            for (offset, ch) in text.chars().enumerate() {
                axis[start + offset] = ch;
            }
        }
        let axis: String = axis.into_iter().collect();
        out.push_str(axis.trim_end());
        out.push_str("\n");
        out.push_str(&" ".repeat(9));
        out.push_str("latency (ms)");
        out
    }
}
