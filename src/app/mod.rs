use std::env;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use console::{style, Term};
use indicatif::HumanDuration;
use tracing::info;

use crate::backend::{ApiClient, BackendKind, IndexStatus, SweepRequest, SweepResponse};
use crate::chart::{project, PlotSample};
use crate::classify::{classify, Category, ConfigParams, ReferenceSelection};
use crate::cli::{parse_value_list, resolve_queries, Cli, Commands};
use crate::config::Config;
use crate::metrics::{derive_speedup, Speedup};
use crate::orchestrator::{BranchOutcome, DualQueryOrchestrator, Submission, Toggles};
use crate::output::{JsonBenchmark, JsonDualSearch, JsonStatus, JsonSweep};
use crate::report;

const RECALL_BAR_WIDTH: usize = 30;
const CHART_WIDTH: usize = 56;
const CHART_HEIGHT: usize = 14;

/// Parameters for executing one side-by-side search.
pub struct SearchParams<'a> {
    pub query: &'a str,
    pub top_k: usize,
    pub no_bf: bool,
    pub no_ivf: bool,
    pub json: bool,
    pub debug: bool,
}

struct ProgressLine {
    term: Term,
    enabled: bool,
}

impl ProgressLine {
    fn stderr() -> Self {
        let term = Term::stderr();
        let enabled = term.is_term();
        Self { term, enabled }
    }

    fn set(&self, message: &str) {
        if self.enabled {
            let _ = self.term.clear_line();
            let _ = self.term.write_str(&format!("\r{message}"));
            let _ = self.term.flush();
        }
    }

    fn clear(&self) {
        if self.enabled {
            let _ = self.term.clear_line();
        }
    }
}

pub fn run() -> Result<()> {
    setup_tracing();
    let cli = parse_cli();
    run_with_cli(cli)
}

pub fn run_with_cli(cli: Cli) -> Result<()> {
    if let Commands::Config { init } = &cli.command {
        return handle_config(*init);
    }

    let client = build_client(&cli)?;

    match cli.command {
        Commands::Search {
            ref query,
            top_k,
            no_bf,
            no_ivf,
            json,
            debug,
        } => handle_search(
            &client,
            SearchParams {
                query,
                top_k,
                no_bf,
                no_ivf,
                json,
                debug,
            },
        ),
        Commands::Benchmark {
            ref queries,
            ref queries_file,
            top_k,
            json,
            report,
        } => handle_benchmark(
            &client,
            queries.as_deref(),
            queries_file.as_ref(),
            top_k,
            json,
            report,
        ),
        Commands::Sweep {
            ref nlist,
            ref nprobe,
            ref queries,
            ref queries_file,
            top_k,
            json,
            report,
            no_chart,
        } => {
            let nlist_values = parse_value_list(nlist)?;
            let nprobe_values = parse_value_list(nprobe)?;
            let sweep_queries = resolve_queries(queries.as_deref(), queries_file.as_ref())?;
            handle_sweep(
                &client,
                SweepRequest {
                    nlist_values,
                    nprobe_values,
                    queries: sweep_queries,
                    top_k,
                },
                json,
                report,
                no_chart,
            )
        }
        Commands::Status { json } => handle_status(&client, json),
        Commands::Feed { ref file } => handle_feed(&client, file),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn build_client(cli: &Cli) -> Result<ApiClient> {
    let config = Config::load()?;
    let base_url = cli
        .url
        .clone()
        .unwrap_or_else(|| config.server.base_url.clone());
    let timeout_secs = cli.timeout.unwrap_or(config.server.timeout_secs);
    Ok(ApiClient::new(&base_url, timeout_secs))
}

fn handle_config(init: bool) -> Result<()> {
    let config_path = Config::config_path();

    if init {
        if config_path.exists() {
            println!(
                "{} Config already exists at {}",
                style("ℹ").cyan(),
                config_path.display()
            );
        } else {
            let path = Config::create_default_config()?;
            println!(
                "{} Created config at {}",
                style("✔").green(),
                path.display()
            );
        }
        return Ok(());
    }

    println!(
        "{} Config path: {}",
        style("ℹ").cyan(),
        config_path.display()
    );
    let config = Config::load()?;
    println!("  Server:  {}", style(&config.server.base_url).bold());
    println!("  Timeout: {}s", config.server.timeout_secs);
    if !config_path.exists() {
        println!();
        println!(
            "  Run {} to create a config file",
            style("annbench config --init").cyan()
        );
    }

    Ok(())
}

fn handle_search(client: &ApiClient, params: SearchParams<'_>) -> Result<()> {
    if params.query.trim().is_empty() {
        return Err(anyhow!("Query must not be empty"));
    }
    if params.top_k == 0 {
        return Err(anyhow!("top_k must be at least 1"));
    }

    let start = Instant::now();
    let mut orchestrator = DualQueryOrchestrator::new(
        Arc::new(client.searcher(BackendKind::BruteForce)),
        Arc::new(client.searcher(BackendKind::Ivf)),
    )
    .with_toggles(Toggles {
        brute_force: !params.no_bf,
        ivf: !params.no_ivf,
    });

    let submission = orchestrator.submit(params.query, params.top_k);
    let elapsed = start.elapsed();

    let bf = orchestrator.displayed(BackendKind::BruteForce);
    let ivf = orchestrator.displayed(BackendKind::Ivf);
    let speedup = derive_speedup(bf.search_time_ms, ivf.search_time_ms);

    if params.json {
        let payload = JsonDualSearch::from_submission(
            params.query,
            params.top_k,
            elapsed,
            &submission,
            bf,
            ivf,
            speedup,
        );
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    render_dual_results(&orchestrator, &submission, params.query);

    if let Some(line) = performance_summary(speedup) {
        println!();
        println!("{line}");
    }

    if params.debug {
        println!();
        println!(
            "{} settled in {:?} (generation {})",
            style("ℹ").cyan(),
            elapsed,
            submission.generation
        );
    }

    Ok(())
}

/// Human-readable comparison line, mirroring what the summary panel shows.
fn performance_summary(speedup: Option<Speedup>) -> Option<String> {
    match speedup? {
        Speedup::NoMeasurableDifference => Some(
            "Both indexes returned results instantly. No performance difference to report."
                .to_string(),
        ),
        Speedup::Ratio(ratio) => {
            let direction = if ratio > 1.0 { "faster" } else { "slower" };
            Some(format!(
                "{} IVF is {} {direction} than BruteForce",
                style("Performance:").bold(),
                style(format!("{ratio:.2}x")).bold()
            ))
        }
    }
}

fn render_dual_results(
    orchestrator: &DualQueryOrchestrator,
    submission: &Submission,
    query: &str,
) {
    for (kind, outcome) in [
        (BackendKind::BruteForce, &submission.brute_force),
        (BackendKind::Ivf, &submission.ivf),
    ] {
        let displayed = orchestrator.displayed(kind);
        let header = match displayed.search_time_ms {
            Some(time_ms) => format!("{} Index ({time_ms:.2}ms)", kind.label()),
            None => format!("{} Index", kind.label()),
        };
        println!("{} {}", style("→").cyan(), style(header).bold());

        match outcome {
            BranchOutcome::Skipped => {
                println!("  {}", style("(inactive)").dim());
            }
            BranchOutcome::Failed(message) => {
                println!("  {} {}", style("⚠").yellow(), message);
            }
            BranchOutcome::Fulfilled if displayed.hits.is_empty() => {
                println!("  {} No matches for {:?}", style("⚠").yellow(), query);
            }
            BranchOutcome::Fulfilled => {
                if let Some(recall) = displayed.recall {
                    println!("  recall vs exact: {}", recall_styled(Some(recall)));
                }
                for (position, hit) in displayed.hits.iter().enumerate() {
                    println!(
                        "  {}. [id {} | distance {:.4}]",
                        position + 1,
                        hit.id,
                        hit.distance
                    );
                    if !hit.text.is_empty() {
                        println!("     {}", hit.text);
                    }
                }
            }
        }
        println!();
    }
}

fn recall_styled(recall: Option<f64>) -> String {
    let value = recall.unwrap_or(0.0);
    let text = format!("{:.2}%", value * 100.0);
    if value >= 0.95 {
        style(text).green().to_string()
    } else if value >= 0.8 {
        style(text).yellow().to_string()
    } else {
        style(text).red().to_string()
    }
}

fn speedup_styled(speedup: Option<f64>) -> String {
    let value = speedup.unwrap_or(0.0);
    let text = format!("{value:.2}x");
    if value >= 5.0 {
        style(text).green().to_string()
    } else if value >= 2.0 {
        style(text).yellow().to_string()
    } else {
        style(text).dim().to_string()
    }
}

/// Proportional bar for a recall value; absent draws an empty track.
fn recall_bar(recall: Option<f64>, width: usize) -> String {
    let value = recall.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (value * width as f64).round() as usize;
    let mut bar = String::with_capacity(width);
    for _ in 0..filled {
        bar.push('█');
    }
    for _ in filled..width {
        bar.push('░');
    }
    bar
}

fn handle_benchmark(
    client: &ApiClient,
    queries: Option<&str>,
    queries_file: Option<&std::path::PathBuf>,
    top_k: usize,
    json: bool,
    as_report: bool,
) -> Result<()> {
    let query_list = resolve_queries(queries, queries_file)?;
    if query_list.is_empty() {
        return Err(anyhow!("Please provide at least one query"));
    }

    let progress = ProgressLine::stderr();
    progress.set(&format!(
        "Running benchmark over {} queries…",
        query_list.len()
    ));
    let start = Instant::now();
    let summary = client
        .benchmark(query_list, top_k)
        .context("Benchmark failed")?;
    progress.clear();
    info!(
        "queries" = summary.num_queries,
        "elapsed_ms" = start.elapsed().as_millis() as u64,
        "msg" = "benchmark complete"
    );

    if json {
        let payload = JsonBenchmark { top_k, summary };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if as_report {
        println!("{}", report::render_benchmark_report(&summary, top_k));
        return Ok(());
    }

    println!(
        "{} Benchmark finished in {}",
        style("✔").green(),
        HumanDuration(start.elapsed())
    );
    println!();
    println!("{}", style("Benchmark Summary").bold());
    println!("  Queries tested:  {}", summary.num_queries);
    println!(
        "  Mean recall@k:   {}",
        recall_styled(summary.mean_recall)
    );
    println!(
        "  Median recall@k: {}",
        recall_styled(summary.median_recall)
    );
    println!("  Min recall:      {}", recall_styled(summary.min_recall));
    println!("  Max recall:      {}", recall_styled(summary.max_recall));
    println!(
        "  Std dev:         ±{:.2}%",
        summary.stddev_recall.unwrap_or(0.0) * 100.0
    );
    println!(
        "  Mean speedup:    {}",
        speedup_styled(summary.mean_speedup)
    );

    if summary.results.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", style("Individual Results").bold());
    println!(
        "  {:<20} {:>8} {:>9} {:>10} {:>10}",
        "query", "recall", "speedup", "bf(ms)", "ivf(ms)"
    );
    for result in &summary.results {
        println!(
            "  {:<20} {:>8} {:>9} {:>10.2} {:>10.2}",
            truncate(&result.query, 20),
            format!("{:.2}%", result.recall_at_k.unwrap_or(0.0) * 100.0),
            format!("{:.2}x", result.speedup_x.unwrap_or(0.0)),
            result.bf_time_ms.unwrap_or(0.0),
            result.ivf_time_ms.unwrap_or(0.0),
        );
    }

    println!();
    println!("{}", style("Recall Distribution").bold());
    for result in &summary.results {
        println!(
            "  {:<16} {} {:>6.1}%",
            truncate(&result.query, 16),
            recall_bar(result.recall_at_k, RECALL_BAR_WIDTH),
            result.recall_at_k.unwrap_or(0.0) * 100.0
        );
    }

    Ok(())
}

fn handle_sweep(
    client: &ApiClient,
    request: SweepRequest,
    json: bool,
    as_report: bool,
    no_chart: bool,
) -> Result<()> {
    if request.nlist_values.is_empty() || request.nprobe_values.is_empty() {
        return Err(anyhow!("Provide at least one nlist and one nprobe value"));
    }
    if request.queries.is_empty() {
        return Err(anyhow!("Please provide at least one query"));
    }

    let progress = ProgressLine::stderr();
    progress.set(&format!(
        "Sweeping {} configurations…",
        request.nlist_values.len() * request.nprobe_values.len()
    ));
    let start = Instant::now();
    let top_k = request.top_k;
    let response = client.sweep(&request).context("Parameter sweep failed")?;
    progress.clear();
    info!(
        "configurations" = response.results.len(),
        "elapsed_ms" = start.elapsed().as_millis() as u64,
        "msg" = "sweep complete"
    );

    if json {
        let payload = JsonSweep::from_response(&response, top_k);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if as_report {
        println!("{}", report::render_sweep_report(&response, top_k));
        return Ok(());
    }

    println!(
        "{} Sweep finished in {}",
        style("✔").green(),
        HumanDuration(start.elapsed())
    );
    println!();
    render_sweep_table(&response);

    if !no_chart {
        println!();
        render_sweep_chart(&response);
    }

    Ok(())
}

fn render_sweep_table(response: &SweepResponse) {
    let refs = ReferenceSelection::from_response(response);

    println!("{}", style("Swept Configurations").bold());
    println!(
        "  {:>6} {:>7} {:>9} {:>9} {:>10}   {}",
        "nlist", "nprobe", "recall", "speedup", "latency", "category"
    );
    for point in &response.results {
        let category = classify(ConfigParams::of(point), &refs);
        let badge = match category {
            Category::Ordinary => String::new(),
            _ => style(category.label()).bold().to_string(),
        };
        println!(
            "  {:>6} {:>7} {:>9} {:>9} {:>10}   {}",
            point.nlist,
            point.nprobe,
            format!("{:.2}%", point.mean_recall.unwrap_or(0.0) * 100.0),
            format!("{:.2}x", point.speedup.unwrap_or(0.0)),
            format!("{:.2}ms", point.mean_latency_ms.unwrap_or(0.0)),
            badge,
        );
    }
}

fn render_sweep_chart(response: &SweepResponse) {
    let samples: Vec<PlotSample> = response
        .results
        .iter()
        .map(|point| PlotSample {
            latency_ms: point.mean_latency_ms,
            recall: point.mean_recall,
        })
        .collect();

    let Some(projection) = project(&samples) else {
        println!("{} Nothing to plot yet", style("ℹ").cyan());
        return;
    };

    let refs = ReferenceSelection::from_response(response);
    let markers: Vec<char> = response
        .results
        .iter()
        .map(|point| classify(ConfigParams::of(point), &refs).marker())
        .collect();

    println!("{}", style("Recall vs Latency").bold());
    println!("{}", projection.render_scatter(CHART_WIDTH, CHART_HEIGHT, &markers));
    println!();
    println!(
        "  {}",
        style("R best recall  S best speedup  L best latency  B best balanced  * ordinary").dim()
    );
}

fn handle_status(client: &ApiClient, json: bool) -> Result<()> {
    let status = client.index_status().context("Failed to fetch index status")?;

    if json {
        let payload = JsonStatus { status };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    render_status(&status);
    Ok(())
}

fn render_status(status: &IndexStatus) {
    let badge = |initialized: bool| {
        if initialized {
            style("●").green()
        } else {
            style("○").dim()
        }
    };

    println!("{} {}", badge(status.bf.initialized), style("BruteForce Index").bold());
    println!(
        "    Status:  {}",
        if status.bf.initialized {
            "Initialized"
        } else {
            "Not initialized"
        }
    );
    println!("    Vectors: {}", status.bf.vector_count);
    println!();
    println!("{} {}", badge(status.ivf.initialized), style("IVF Index").bold());
    println!(
        "    Status:  {}",
        if status.ivf.initialized {
            "Initialized"
        } else {
            "Not initialized"
        }
    );
    println!("    Vectors: {}", status.ivf.vector_count);
    println!("    nlist:   {}", status.ivf.nlist);
    println!("    nprobe:  {}", status.ivf.nprobe);
}

fn handle_feed(client: &ApiClient, file: &std::path::Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let batch: Vec<String> = contents
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect();

    if batch.is_empty() {
        return Err(anyhow!("{} contains no non-empty lines", file.display()));
    }

    let progress = ProgressLine::stderr();
    progress.set(&format!("Uploading {} documents…", batch.len()));
    let response = client.add_batch(batch).context("Upload failed")?;
    progress.clear();

    println!(
        "{} Added {} items to both indexes",
        style("✔").green(),
        response.added.len()
    );
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn parse_cli() -> Cli {
    if let Ok(raw) = env::var("ANNBENCH_TEST_ARGS") {
        let mut parts = vec!["annbench".to_string()];
        parts.extend(raw.split_whitespace().map(|s| s.to_string()));
        return Cli::parse_from(parts);
    }
    Cli::parse()
}

fn setup_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "annbench=info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
