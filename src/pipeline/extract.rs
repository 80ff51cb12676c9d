use crate::core::config::{ExtractionMode, ScanConfig};
use crate::edgar::filing::{document_table, DocumentTable};
use crate::edgar::parsing::{clip_chars, html_to_text, keyword_windows, truncate_at_marker};
use crate::fetch::Fetch;
use crate::inference::{answer, prompts, InferenceGateway, Oracle};

use super::SkipReason;

/// Filing text ready to be questioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilingContent {
    /// The primary document, cut at its form marker.
    Document(String),
    /// Keyword-centred excerpts across every linked document.
    Excerpts(Vec<String>),
}

async fn fetch_table<F: Fetch + ?Sized>(fetcher: &F, detail_url: &str) -> Result<DocumentTable, SkipReason> {
    let page = fetcher.get(detail_url).await.ok_or(SkipReason::Transport)?;
    document_table(&page).ok_or_else(|| {
        log::debug!("No table on filing detail page {}", detail_url);
        SkipReason::Parse
    })
}

/// Turns a filing detail page into model input according to `config.mode`.
/// Any failure along the way drops the whole filing.
pub async fn extract_content<F, G>(
    fetcher: &F,
    oracle: &Oracle<G>,
    config: &ScanConfig,
    detail_url: &str,
) -> Result<FilingContent, SkipReason>
where
    F: Fetch + ?Sized,
    G: InferenceGateway,
{
    match config.mode {
        ExtractionMode::Truncate => extract_document(fetcher, oracle, config, detail_url).await,
        ExtractionMode::Excerpts => extract_excerpts(fetcher, oracle, config, detail_url).await,
    }
}

async fn extract_document<F, G>(
    fetcher: &F,
    oracle: &Oracle<G>,
    config: &ScanConfig,
    detail_url: &str,
) -> Result<FilingContent, SkipReason>
where
    F: Fetch + ?Sized,
    G: InferenceGateway,
{
    let table = fetch_table(fetcher, detail_url).await?;

    let link = match table.primary_document(&config.form_type) {
        Some(doc) => doc.href.clone(),
        None => {
            log::debug!("No {} row in {}, asking the model", config.form_type, detail_url);
            oracle
                .ask(
                    "document link",
                    &prompts::document_link(&config.form_type, &table.html),
                    answer::parse_link,
                )
                .await
                .ok_or(SkipReason::NoDocument)?
        }
    };

    let raw = fetcher.get(&link).await.ok_or(SkipReason::Transport)?;
    let text = html_to_text(&raw);
    let mut body = truncate_at_marker(&text);
    if let Some(limit) = config.char_limit {
        body = clip_chars(body, limit);
    }
    if body.is_empty() {
        return Err(SkipReason::Parse);
    }

    let is_filing = oracle
        .ask(
            "filing check",
            &prompts::looks_like_filing(&config.form_type, body),
            answer::parse_yes_no,
        )
        .await;
    if is_filing != Some(true) {
        log::debug!("{} does not look like an {} filing", link, config.form_type);
        return Err(SkipReason::NotFiling);
    }

    Ok(FilingContent::Document(body.to_string()))
}

async fn extract_excerpts<F, G>(
    fetcher: &F,
    oracle: &Oracle<G>,
    config: &ScanConfig,
    detail_url: &str,
) -> Result<FilingContent, SkipReason>
where
    F: Fetch + ?Sized,
    G: InferenceGateway,
{
    let table = fetch_table(fetcher, detail_url).await?;

    let mut links: Vec<String> = table.text_documents().map(|d| d.href.clone()).collect();
    if links.is_empty() {
        links = oracle
            .ask("table links", &prompts::table_links(&table.html), answer::parse_links)
            .await
            .ok_or(SkipReason::NoDocument)?
            .into_iter()
            .filter(|l| !l.to_ascii_lowercase().contains(".jpg"))
            .collect();
    }
    if links.is_empty() {
        return Err(SkipReason::NoDocument);
    }

    let mut excerpts = Vec::new();
    for link in &links {
        let raw = fetcher.get(link).await.ok_or(SkipReason::Transport)?;
        let text = html_to_text(&raw);
        excerpts.extend(keyword_windows(&text, config.keywords.as_slice(), config.window));
    }
    log::debug!("{} excerpts from {} documents", excerpts.len(), links.len());

    if excerpts.is_empty() {
        return Err(SkipReason::NoExcerpts);
    }
    Ok(FilingContent::Excerpts(excerpts))
}
