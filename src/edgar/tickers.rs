use anyhow::{anyhow, Context, Result};
use mime::APPLICATION_JSON;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::fetch::Fetch;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(ticker: String) -> Result<Self> {
        let uppercase_ticker = ticker.trim().to_uppercase();
        if uppercase_ticker.is_empty() {
            return Err(anyhow!("Ticker cannot be empty"));
        }
        if !uppercase_ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(anyhow!(
                "Ticker must contain only alphanumeric characters, dots or hyphens: {}",
                ticker
            ));
        }
        Ok(Ticker(uppercase_ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One filer from the company directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRecord {
    pub ticker: Ticker,
    pub cik: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    cik_str: u64,
    ticker: String,
    #[serde(default)]
    title: String,
}

/// Parses `company_tickers.json`.
///
/// The document is an object keyed by rank (`"0"`, `"1"`, ...). Records come
/// back in rank order; when a ticker repeats, the later entry replaces the
/// earlier one in place.
pub fn parse_directory(json: &str) -> Result<Vec<CompanyRecord>> {
    let raw: HashMap<String, DirectoryEntry> =
        serde_json::from_str(json).context("Failed to parse company directory JSON")?;
    log::debug!("Found {} ticker entries", raw.len());

    let mut ranked: Vec<(u64, DirectoryEntry)> = raw
        .into_iter()
        .map(|(key, entry)| (key.parse::<u64>().unwrap_or(u64::MAX), entry))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);

    let mut records: Vec<CompanyRecord> = Vec::with_capacity(ranked.len());
    let mut positions: HashMap<Ticker, usize> = HashMap::new();

    for (_, entry) in ranked {
        let ticker = match Ticker::new(entry.ticker.clone()) {
            Ok(t) => t,
            Err(e) => {
                log::debug!("Skipping directory entry {}: {}", entry.ticker, e);
                continue;
            }
        };
        let record = CompanyRecord {
            ticker: ticker.clone(),
            cik: entry.cik_str.to_string(),
            title: entry.title.trim().to_string(),
        };
        match positions.get(&ticker) {
            Some(&i) => records[i] = record,
            None => {
                positions.insert(ticker, records.len());
                records.push(record);
            }
        }
    }

    Ok(records)
}

/// Loads the company directory, reusing `cache` when it already exists and
/// populating it after a fresh download.
pub async fn fetch_directory<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
    cache: Option<&Path>,
) -> Result<Vec<CompanyRecord>> {
    if let Some(path) = cache {
        if path.exists() {
            log::debug!("Using existing tickers file at {:?}", path);
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read tickers cache {:?}", path))?;
            return parse_directory(&json);
        }
    }

    log::debug!("Fetching tickers from {}", url);
    let json = fetcher
        .get_with_accept(url, APPLICATION_JSON.as_ref())
        .await
        .ok_or_else(|| anyhow!("Failed to download company directory from {}", url))?;
    let records = parse_directory(&json)?;

    if let Some(path) = cache {
        super::utils::save_verified_json(path, &json)?;
        log::debug!("Saved tickers file to {:?}", path);
    }

    Ok(records)
}

/// Keeps the allow-listed tickers (all when empty), then applies `limit`.
pub fn select_companies(
    records: Vec<CompanyRecord>,
    tickers: &[String],
    limit: Option<usize>,
) -> Vec<CompanyRecord> {
    let wanted: Vec<String> = tickers.iter().map(|t| t.trim().to_uppercase()).collect();
    records
        .into_iter()
        .filter(|r| wanted.is_empty() || wanted.iter().any(|w| w == r.ticker.as_str()))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
