use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::edgar::{self, parsing::text};
use crate::inference;

/// How filing documents are turned into model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExtractionMode {
    /// Primary document only, cut at the first `FORM 8-K` marker.
    Truncate,
    /// Keyword-centred excerpts from every document in the filing.
    Excerpts,
}

/// Which local inference endpoint answers the questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Backend {
    /// Spawn `ollama run <model>` per question.
    Command,
    /// POST to the Ollama HTTP API.
    Api,
}

#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub user_agent: String,
    pub model: String,
    pub backend: Backend,
    pub ollama_bin: PathBuf,
    pub ollama_host: String,
    pub mode: ExtractionMode,
    pub output_path: PathBuf,
    pub directory_url: String,
    pub directory_cache: Option<PathBuf>,
    pub tickers: Vec<String>,
    pub limit: Option<usize>,
    pub form_type: String,
    pub filing_count: usize,
    pub item_codes: Vec<String>,
    pub keywords: Vec<String>,
    pub window: usize,
    pub char_limit: Option<usize>,
    pub answer_attempts: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub show_progress: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            user_agent: edgar::USER_AGENT.to_string(),
            model: inference::DEFAULT_MODEL.to_string(),
            backend: Backend::Command,
            ollama_bin: PathBuf::from(inference::DEFAULT_OLLAMA_BIN),
            ollama_host: inference::DEFAULT_OLLAMA_HOST.to_string(),
            mode: ExtractionMode::Truncate,
            output_path: PathBuf::from("output.csv"),
            directory_url: edgar::TICKER_URL.to_string(),
            directory_cache: None,
            tickers: Vec::new(),
            limit: None,
            form_type: edgar::FORM_8K.to_string(),
            filing_count: edgar::FEED_COUNT,
            item_codes: edgar::ITEM_CODES.iter().map(|c| c.to_string()).collect(),
            keywords: text::KEYWORDS.iter().map(|k| k.to_string()).collect(),
            window: text::WINDOW,
            char_limit: None,
            answer_attempts: 2,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            show_progress: true,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ScanConfig {
    /// Defaults overlaid with `LAUNCHSCAN_*` / `OLLAMA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_agent) = env_var("LAUNCHSCAN_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(model) = env_var("LAUNCHSCAN_MODEL") {
            config.model = model;
        }
        if let Some(backend) = env_var("LAUNCHSCAN_BACKEND") {
            config.backend = Backend::from_str(&backend)
                .map_err(|_| anyhow!("Unknown LAUNCHSCAN_BACKEND: {}", backend))?;
        }
        if let Some(bin) = env_var("OLLAMA_BIN") {
            config.ollama_bin = PathBuf::from(bin);
        }
        if let Some(host) = env_var("OLLAMA_HOST") {
            config.ollama_host = normalize_host(&host);
        }
        if let Some(mode) = env_var("LAUNCHSCAN_MODE") {
            config.mode = ExtractionMode::from_str(&mode)
                .map_err(|_| anyhow!("Unknown LAUNCHSCAN_MODE: {}", mode))?;
        }
        if let Some(output) = env_var("LAUNCHSCAN_OUTPUT") {
            config.output_path = PathBuf::from(output);
        }
        if let Some(cache) = env_var("LAUNCHSCAN_DIRECTORY_CACHE") {
            config.directory_cache = Some(PathBuf::from(cache));
        }
        if let Some(attempts) = env_var("LAUNCHSCAN_ANSWER_ATTEMPTS") {
            config.answer_attempts = attempts
                .parse()
                .with_context(|| format!("Invalid LAUNCHSCAN_ANSWER_ATTEMPTS: {}", attempts))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(anyhow!("User agent cannot be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("Model name cannot be empty"));
        }
        if self.answer_attempts == 0 {
            return Err(anyhow!("Answer attempts must be at least 1"));
        }
        if self.filing_count == 0 {
            return Err(anyhow!("Filing count must be at least 1"));
        }
        if self.mode == ExtractionMode::Excerpts && self.keywords.is_empty() {
            return Err(anyhow!("Excerpt mode needs at least one keyword"));
        }
        if matches!(self.char_limit, Some(0)) {
            return Err(anyhow!("Character limit must be positive"));
        }
        Ok(())
    }
}

/// `OLLAMA_HOST` is commonly set as a bare `host:port`.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
