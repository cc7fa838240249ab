//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cache::CollectionCache;
use crate::collector::DirectoryCollector;
use crate::config::{
    HarvestConfig, DEFAULT_CACHE_DIR, DEFAULT_DIRECTORY_URL, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MAX_RETRIES, DEFAULT_OUTPUT_DIR, DEFAULT_REQUEST_DELAY_MS,
};
use crate::error::Result;
use crate::fetch::{HttpFetcher, LoadOptions};
use crate::harvester::{Harvester, StopSignal};
use crate::platform::classify;
use crate::progress::{ProgressSnapshot, RunObserver};
use crate::render::HtmlRenderer;
use crate::retry::RetryPolicy;
use crate::summary::{RunReport, SUMMARY_FILE};
use crate::types::{ScrapeResult, ScrapeStatus};

/// Ethics Harvester - Collect municipal ethics codes from code hosting platforms.
#[derive(Parser)]
#[command(name = "ethics-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect municipalities and extract their ethics chapters.
    Run(RunArgs),

    /// Refresh the cached municipality lists only.
    Collect {
        /// Two-letter state codes (e.g., UT)
        #[arg(short, long = "state", value_name = "ST", required = true, num_args = 1..)]
        states: Vec<String>,

        /// Directory holding the municipality lists
        #[arg(long, default_value = DEFAULT_CACHE_DIR)]
        cache_dir: PathBuf,

        /// Directory page URL, `{state}` is replaced by the state code
        #[arg(long, default_value = DEFAULT_DIRECTORY_URL)]
        directory_url: String,
    },

    /// Print the platform a code URL is hosted on.
    Classify {
        /// Municipal code URL
        url: String,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Two-letter state codes (e.g., UT)
    #[arg(short, long = "state", value_name = "ST", required = true, num_args = 1..)]
    pub states: Vec<String>,

    /// Process at most this many municipalities
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Re-collect municipality lists even when cached
    #[arg(long)]
    pub recollect: bool,

    /// Retries for transient page-load failures
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub retries: u32,

    /// Minimum delay between page loads, in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_DELAY_MS)]
    pub delay_ms: u64,

    /// Page load timeout, in seconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Output directory for documents and the run summary
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Directory holding the municipality lists
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Directory page URL, `{state}` is replaced by the state code
    #[arg(long, default_value = DEFAULT_DIRECTORY_URL)]
    pub directory_url: String,
}

impl RunArgs {
    /// Resolve the arguments into a run configuration.
    pub fn to_config(&self) -> Result<HarvestConfig> {
        let config = HarvestConfig::for_states(&self.states)?;
        let backoff = config.retry.backoff;
        let config = config
            .with_limit(self.limit)
            .with_force_recollect(self.recollect)
            .with_retry(RetryPolicy::new(self.retries, backoff))
            .with_request_delay(Duration::from_millis(self.delay_ms))
            .with_fetch_timeout(Duration::from_secs(self.timeout_secs))
            .with_output_dir(&self.output)
            .with_cache_dir(&self.cache_dir);
        config.validate()?;
        Ok(config)
    }
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_command(&args),
        Commands::Collect {
            states,
            cache_dir,
            directory_url,
        } => collect_command(&states, &cache_dir, &directory_url),
        Commands::Classify { url } => {
            println!("{}", classify(&url));
            Ok(())
        }
    }
}

/// Execute the run command.
fn run_command(args: &RunArgs) -> Result<()> {
    let config = args.to_config()?;

    let stop = StopSignal::new();
    listen_for_ctrl_c(stop.clone());

    let cache = CollectionCache::new(&config.cache_dir);
    let mut collector = DirectoryCollector::new(HttpFetcher::new()?)
        .with_url_template(&args.directory_url)
        .with_load_options(LoadOptions {
            timeout: config.fetch_timeout,
        })
        .with_retry(config.retry);
    let renderer = HtmlRenderer::new(&config.output_dir);
    let output_dir = config.output_dir.clone();

    println!(
        "{} ethics codes for {}",
        style("Harvesting").bold(),
        style(config.states.join(", ")).cyan()
    );
    if let Some(limit) = config.limit {
        println!("  Limit: {limit} municipalities");
    }
    println!();

    let mut harvester =
        Harvester::new(config, HttpFetcher::new()?, renderer)?.with_stop_signal(stop);
    let mut observer = ProgressBarObserver::new();
    let report = harvester.run(&cache, &mut collector, &mut observer)?;

    print_report(&report, &output_dir);
    Ok(())
}

/// Execute the collect command.
fn collect_command(states: &[String], cache_dir: &Path, directory_url: &str) -> Result<()> {
    let config = HarvestConfig::for_states(states)?;
    let cache = CollectionCache::new(cache_dir);
    let mut collector = DirectoryCollector::new(HttpFetcher::new()?)
        .with_url_template(directory_url)
        .with_retry(config.retry);

    for state in &config.states {
        println!("{} {}", style("Collecting").bold(), style(state).cyan());
        let municipalities = cache.load(state, true, &mut collector)?;
        println!(
            "  {} municipalities saved to {}",
            style(municipalities.len()).green(),
            cache.path_for(state).display()
        );
    }
    Ok(())
}

/// Set the stop signal on the first Ctrl+C; exit on the second.
///
/// The second Ctrl+C exits at once with status 130. The municipality in
/// flight is dropped and the run summary keeps the checkpoint written after
/// the last finished municipality.
fn listen_for_ctrl_c(stop: StopSignal) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                tracing::warn!(
                    "Stop requested, finishing current municipality (Ctrl+C again to exit now)"
                );
                stop.stop();
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!(
                        "Exiting without finishing; run summary is from the last checkpoint"
                    );
                    std::process::exit(130);
                }
            });
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
    }
}

/// Progress bar over the municipalities of a run.
struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid template")
                .progress_chars("=> "),
        );
        Self { bar }
    }
}

impl RunObserver for ProgressBarObserver {
    fn begin(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn recorded(&mut self, result: &ScrapeResult, progress: &ProgressSnapshot) {
        self.bar.set_position(progress.attempted as u64);
        self.bar
            .set_message(format!("{} {}", result.municipality_id, status_label(result.status)));
    }

    fn finish(&mut self, _progress: &ProgressSnapshot) {
        self.bar.finish_and_clear();
    }
}

fn status_label(status: ScrapeStatus) -> String {
    match status {
        ScrapeStatus::Success => style("saved").green().to_string(),
        ScrapeStatus::NotFound => style("not found").yellow().to_string(),
        ScrapeStatus::Error(kind) => style(format!("{kind} error")).red().to_string(),
    }
}

fn print_report(report: &RunReport, output_dir: &Path) {
    let progress = &report.progress;

    println!();
    if report.stopped {
        println!("{}", style("Run stopped").yellow().bold());
    } else {
        println!("{}", style("Run complete").green().bold());
    }
    println!("  Processed: {}/{}", progress.attempted, progress.total);
    println!("  Saved: {}", style(progress.succeeded).green());
    println!("  Ethics chapter found: {}", progress.found);
    println!("  No ethics chapter: {}", progress.not_found);
    for (kind, count) in &progress.errors_by_kind {
        println!("  Errors ({kind}): {}", style(count).red().bold());
    }
    println!("  Elapsed: {:.1}s", progress.elapsed.as_secs_f64());

    println!();
    println!(
        "{} {}",
        style("Summary:").green().bold(),
        output_dir.join(SUMMARY_FILE).display()
    );
}
