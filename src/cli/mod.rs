use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};

/// Built-in benchmark queries used when none are supplied.
pub const DEFAULT_QUERIES: &[&str] = &[
    "tree",
    "cattle",
    "lord",
    "mountain",
    "ocean",
    "building",
    "computer",
    "happiness",
    "science",
    "art",
    "technology",
    "nature",
    "history",
    "music",
    "food",
];

#[derive(Parser, Debug, Clone)]
#[command(
    name = "annbench",
    version,
    about = "Side-by-side comparison of exact vs clustered vector search"
)]
pub struct Cli {
    /// Base URL of the backend service. Also reads ANNBENCH_URL.
    #[arg(global = true, long, env = "ANNBENCH_URL")]
    pub url: Option<String>,

    /// Request timeout in seconds. Also reads ANNBENCH_TIMEOUT.
    #[arg(global = true, long, env = "ANNBENCH_TIMEOUT")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Query both indexes side by side
    Search {
        /// Query text such as "ocean"
        query: String,
        /// Results to request from each index
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
        /// Skip the brute-force index
        #[arg(long)]
        no_bf: bool,
        /// Skip the IVF index
        #[arg(long)]
        no_ivf: bool,
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
        /// Show timing/debug info
        #[arg(long)]
        debug: bool,
    },
    /// Benchmark IVF recall and speedup against BruteForce
    Benchmark {
        /// Comma-separated queries (defaults to a built-in word list)
        #[arg(long)]
        queries: Option<String>,
        /// Read queries from a file, one per line
        #[arg(long, value_hint = ValueHint::FilePath)]
        queries_file: Option<PathBuf>,
        /// Results to request per query
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
        /// Print the copyable text report instead of the table view
        #[arg(long)]
        report: bool,
    },
    /// Sweep IVF nlist/nprobe configurations
    Sweep {
        /// Comma-separated cluster counts to try
        #[arg(long, default_value = "4,16,64,256")]
        nlist: String,
        /// Comma-separated probe counts to try
        #[arg(long, default_value = "1,4,16")]
        nprobe: String,
        /// Comma-separated queries (defaults to a built-in word list)
        #[arg(long)]
        queries: Option<String>,
        /// Read queries from a file, one per line
        #[arg(long, value_hint = ValueHint::FilePath)]
        queries_file: Option<PathBuf>,
        /// Results to request per query
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
        /// Print the copyable text report instead of the table view
        #[arg(long)]
        report: bool,
        /// Suppress the recall/latency scatter chart
        #[arg(long)]
        no_chart: bool,
    },
    /// Show index status on the backend
    Status {
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
    },
    /// Upload a text file's non-empty lines to both indexes
    Feed {
        /// Text file, one document per line
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Show or create configuration
    Config {
        /// Create a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Split a comma-separated list into trimmed, non-empty entries.
pub fn parse_query_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

/// Parse a comma-separated list of positive integers, e.g. "4,16,64".
pub fn parse_value_list(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<u32>()
                .with_context(|| format!("Invalid list entry: {entry:?}"))
        })
        .collect()
}

/// Resolve benchmark/sweep queries from an inline list, a file, or the
/// built-in defaults, in that order.
pub fn resolve_queries(inline: Option<&str>, file: Option<&PathBuf>) -> Result<Vec<String>> {
    if let Some(raw) = inline {
        return Ok(parse_query_list(raw));
    }
    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read queries file: {}", path.display()))?;
        return Ok(contents
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect());
    }
    Ok(DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect())
}
