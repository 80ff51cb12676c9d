use anyhow::Result;
use colored::*;
use launchscan::{
    core::config::normalize_host,
    edgar::tickers::{fetch_directory, select_companies},
    fetch::HttpFetcher,
    inference::gateway_from_config,
    output::read_findings,
    Backend, ExtractionMode, FindingWriter, RunStats, ScanConfig, Scanner,
};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "launchscan-cli",
    about = "Scan 8-K filings for new product launches"
)]
struct Opt {
    /// Findings file, truncated at the start of every run
    #[structopt(long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// truncate (primary document) or excerpts (keyword windows)
    #[structopt(long)]
    mode: Option<ExtractionMode>,

    /// Model name passed to ollama
    #[structopt(long)]
    model: Option<String>,

    /// command (spawn ollama) or api (HTTP)
    #[structopt(long)]
    backend: Option<Backend>,

    #[structopt(long)]
    ollama_host: Option<String>,

    #[structopt(long, parse(from_os_str))]
    ollama_bin: Option<PathBuf>,

    /// Only scan these tickers, comma separated
    #[structopt(long, use_delimiter = true)]
    tickers: Vec<String>,

    /// Stop after this many companies
    #[structopt(long)]
    limit: Option<usize>,

    /// Reuse (or create) a local copy of company_tickers.json
    #[structopt(long, parse(from_os_str))]
    directory_cache: Option<PathBuf>,

    /// Clip filing text sent to the model to this many characters
    #[structopt(long)]
    char_limit: Option<usize>,

    /// How many times to ask before giving up on a reply
    #[structopt(long)]
    answer_attempts: Option<usize>,

    #[structopt(long)]
    no_progress: bool,

    /// Print the findings already in the output file and exit
    #[structopt(long)]
    summarize: bool,
}

impl Opt {
    fn apply(self, config: &mut ScanConfig) {
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(host) = self.ollama_host {
            config.ollama_host = normalize_host(&host);
        }
        if let Some(bin) = self.ollama_bin {
            config.ollama_bin = bin;
        }
        if !self.tickers.is_empty() {
            config.tickers = self.tickers;
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if self.directory_cache.is_some() {
            config.directory_cache = self.directory_cache;
        }
        if self.char_limit.is_some() {
            config.char_limit = self.char_limit;
        }
        if let Some(attempts) = self.answer_attempts {
            config.answer_attempts = attempts;
        }
        if self.no_progress {
            config.show_progress = false;
        }
    }
}

fn summarize(path: &Path) -> Result<()> {
    let findings = read_findings(path)?;
    if findings.is_empty() {
        println!("{}", "No findings yet.".yellow());
        return Ok(());
    }
    for finding in &findings {
        println!(
            "{} {} {} {}",
            finding.filing_date.to_string().dimmed(),
            finding.ticker.cyan().bold(),
            finding.product_name.green(),
            finding.product_description
        );
    }
    println!("\n{} findings in {}", findings.len(), path.display());
    Ok(())
}

fn print_stats(stats: &RunStats, output: &Path) {
    println!("\n{}", "Scan complete".green().bold());
    println!("{}", stats);
    println!("Findings written to {}", output.display().to_string().blue());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    log::debug!("Logger initialized");

    let opt = Opt::from_args();
    let summarize_only = opt.summarize;

    let mut config = ScanConfig::from_env()?;
    opt.apply(&mut config);
    config.validate()?;

    if summarize_only {
        return summarize(&config.output_path);
    }

    log::info!(
        "Scanning with {} ({} backend, {} mode)",
        config.model,
        config.backend,
        config.mode
    );

    let fetcher = HttpFetcher::new(
        &config.user_agent,
        config.request_timeout,
        config.connect_timeout,
    )?;
    let gateway = gateway_from_config(&config)?;

    let records = fetch_directory(
        &fetcher,
        &config.directory_url,
        config.directory_cache.as_deref(),
    )
    .await?;
    let companies = select_companies(records, &config.tickers, config.limit);
    if companies.is_empty() {
        println!("{}", "No companies matched the ticker selection.".yellow());
        return Ok(());
    }
    println!(
        "{} {} companies",
        "Scanning".green(),
        companies.len().to_string().bold()
    );

    let output = config.output_path.clone();
    let writer = FindingWriter::create(&output)?;
    let mut scanner = Scanner::new(config, fetcher, gateway, writer);
    scanner.run(&companies).await?;
    let stats = scanner.finish()?;

    print_stats(&stats, &output);
    Ok(())
}
