mod extract;
mod stats;

pub use extract::{extract_content, FilingContent};
pub use stats::{RunStats, SkipReason};

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashSet;

use crate::core::config::ScanConfig;
use crate::edgar::index::{filing_index_url, parse_feed, CompanyInfo, FilingEntry};
use crate::edgar::tickers::CompanyRecord;
use crate::fetch::Fetch;
use crate::inference::{answer, prompts, InferenceGateway, Oracle};
use crate::output::{FindingWriter, ProductFinding};
use crate::utils::progress::ProgressTracker;

/// The filing a product was found in.
struct FilingContext<'a> {
    company_name: &'a str,
    ticker: &'a str,
    filing_date: NaiveDate,
}

/// Walks companies one at a time: filing feed, item filter, filing content,
/// product questions, one output row per accepted product.
///
/// Only output failures abort a run. Everything else skips the company,
/// filing, excerpt or product at hand and is counted in [`RunStats`].
pub struct Scanner<F, G> {
    config: ScanConfig,
    fetcher: F,
    oracle: Oracle<G>,
    writer: FindingWriter,
    progress: ProgressTracker,
    stats: RunStats,
}

impl<F: Fetch, G: InferenceGateway> Scanner<F, G> {
    pub fn new(config: ScanConfig, fetcher: F, gateway: G, writer: FindingWriter) -> Self {
        let progress = ProgressTracker::new(config.show_progress);
        let oracle = Oracle::new(gateway, config.answer_attempts);
        Self {
            config,
            fetcher,
            oracle,
            writer,
            progress,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn gateway(&self) -> &G {
        self.oracle.gateway()
    }

    /// Flushes the output file and returns the run's counters.
    pub fn finish(self) -> Result<RunStats> {
        self.writer.finish()?;
        Ok(self.stats)
    }

    pub async fn run(&mut self, companies: &[CompanyRecord]) -> Result<&RunStats> {
        self.progress.start_progress(companies.len() as u64);
        for company in companies {
            self.progress.update_message(company.ticker.as_str());
            self.scan_company(company).await?;
            self.progress.increment(1);
        }
        self.progress.finish();
        Ok(&self.stats)
    }

    pub async fn scan_company(&mut self, company: &CompanyRecord) -> Result<()> {
        self.stats.companies += 1;
        log::info!("Getting {} filings for {}", self.config.form_type, company.ticker);

        let url = filing_index_url(&company.cik, &self.config.form_type, self.config.filing_count)?;
        let Some(xml) = self.fetcher.get(url.as_str()).await else {
            self.stats.skip(SkipReason::Transport);
            return Ok(());
        };
        let feed = match parse_feed(&xml) {
            Ok(feed) => feed,
            Err(e) => {
                log::warn!("Skipping {}: {:#}", company.ticker, e);
                self.stats.skip(SkipReason::Parse);
                return Ok(());
            }
        };
        log::info!("Found {} entries for {}", feed.entries.len(), company.ticker);

        let Some(company_name) = self.resolve_company_name(company, feed.info.as_ref()).await else {
            log::warn!("No company name for {}, skipping its filings", company.ticker);
            self.stats.skip(SkipReason::MissingField);
            return Ok(());
        };

        for entry in &feed.entries {
            self.scan_filing(&company_name, company.ticker.as_str(), entry)
                .await?;
        }
        Ok(())
    }

    /// Tagged `conformed-name`, else the model's reading of the
    /// `company-info` block. An `NA` from the model drops the company. The
    /// directory title is only used when the feed has no `company-info`.
    async fn resolve_company_name(
        &self,
        company: &CompanyRecord,
        info: Option<&CompanyInfo>,
    ) -> Option<String> {
        let Some(info) = info else {
            return Some(company.title.clone()).filter(|t| !t.is_empty());
        };
        if let Some(name) = &info.conformed_name {
            return Some(name.clone());
        }
        self.oracle
            .ask("company name", &prompts::company_name(&info.fragment), answer::parse_text)
            .await
    }

    pub async fn scan_filing(
        &mut self,
        company_name: &str,
        ticker: &str,
        entry: &FilingEntry,
    ) -> Result<()> {
        self.stats.filings_seen += 1;

        if !entry.passes_item_filter(self.config.item_codes.as_slice()) {
            log::debug!("Skipping {}: items {:?}", entry.label(), entry.items_desc);
            self.stats.skip(SkipReason::ItemFilter);
            return Ok(());
        }
        self.stats.filings_matched += 1;

        let (Some(filing_date), Some(detail_url)) = (entry.filing_date, entry.filing_href.as_deref())
        else {
            log::debug!("Skipping {}: missing filing date or link", entry.label());
            self.stats.skip(SkipReason::MissingField);
            return Ok(());
        };

        let content =
            match extract_content(&self.fetcher, &self.oracle, &self.config, detail_url).await {
                Ok(content) => content,
                Err(reason) => {
                    log::debug!("Skipping {} ({})", entry.label(), reason);
                    self.stats.skip(reason);
                    return Ok(());
                }
            };
        self.stats.filings_extracted += 1;
        log::info!("{} {} {}", company_name, filing_date, entry.label());

        let filing = FilingContext {
            company_name,
            ticker,
            filing_date,
        };
        match content {
            FilingContent::Document(text) => self.findings_from_document(&filing, &text).await,
            FilingContent::Excerpts(excerpts) => {
                self.findings_from_excerpts(&filing, &excerpts).await
            }
        }
    }

    /// `None` when the filing cannot be read; failures are never raised.
    pub async fn extract_content(&self, detail_url: &str) -> Option<FilingContent> {
        extract_content(&self.fetcher, &self.oracle, &self.config, detail_url)
            .await
            .ok()
    }

    async fn findings_from_document(&mut self, filing: &FilingContext<'_>, text: &str) -> Result<()> {
        let Some(summary) = self
            .oracle
            .ask("product lookup", &prompts::product_lookup(text), answer::parse_text)
            .await
        else {
            self.stats.skip(SkipReason::NoProducts);
            return Ok(());
        };

        let Some(products) = self
            .oracle
            .ask("product names", &prompts::product_names(&summary), answer::parse_list)
            .await
        else {
            self.stats.skip(SkipReason::NoProducts);
            return Ok(());
        };

        for product in &products {
            self.describe_and_record(filing, product).await?;
        }
        Ok(())
    }

    async fn findings_from_excerpts(
        &mut self,
        filing: &FilingContext<'_>,
        excerpts: &[String],
    ) -> Result<()> {
        let mut seen: HashSet<String> = HashSet::new();

        for excerpt in excerpts {
            self.stats.excerpts += 1;

            let mentions_launch = self
                .oracle
                .ask(
                    "launch check",
                    &prompts::excerpt_mentions_launch(filing.company_name, excerpt),
                    answer::parse_yes_no,
                )
                .await;
            if mentions_launch != Some(true) {
                self.stats.skip(SkipReason::NoProducts);
                continue;
            }

            let Some(products) = self
                .oracle
                .ask("product names", &prompts::product_names(excerpt), answer::parse_list)
                .await
            else {
                self.stats.skip(SkipReason::NoProducts);
                continue;
            };

            for product in &products {
                if !seen.insert(product.to_lowercase()) {
                    log::debug!("Already reported {} for this filing", product);
                    self.stats.skip(SkipReason::Duplicate);
                    continue;
                }
                self.describe_and_record(filing, product).await?;
            }
        }
        Ok(())
    }

    async fn describe_and_record(&mut self, filing: &FilingContext<'_>, product: &str) -> Result<()> {
        let Some(description) = self
            .oracle
            .ask(
                "product description",
                &prompts::product_description(filing.company_name, product),
                answer::parse_text,
            )
            .await
        else {
            self.stats.skip(SkipReason::NotCompanyProduct);
            return Ok(());
        };

        let finding = ProductFinding::new(
            filing.company_name,
            filing.ticker,
            filing.filing_date,
            product,
            &description,
        );
        self.writer.append(&finding)?;
        self.stats.findings += 1;
        log::info!("New product for {}: {}", filing.ticker, finding.product_name);
        Ok(())
    }
}
