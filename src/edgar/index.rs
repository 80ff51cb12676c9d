use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use url::Url;

use super::BROWSE_EDGAR_URL;

static XML_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>").expect("valid declaration regex"));

/// Filer details from the feed's `<company-info>` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyInfo {
    pub cik: Option<String>,
    pub conformed_name: Option<String>,
    /// Raw XML of the block, handed to the model when no name is tagged.
    pub fragment: String,
}

/// One `<entry>` of a company's filing feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilingEntry {
    pub accession_number: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub filing_href: Option<String>,
    pub filing_type: Option<String>,
    pub form_name: Option<String>,
    pub items_desc: Option<String>,
}

impl FilingEntry {
    /// True when `<items-desc>` mentions at least one of `codes`. Entries
    /// without an items description never pass.
    pub fn passes_item_filter<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        match &self.items_desc {
            Some(items) => codes.iter().any(|code| items.contains(code.as_ref())),
            None => false,
        }
    }

    pub fn label(&self) -> &str {
        self.accession_number.as_deref().unwrap_or("<unknown accession>")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyFeed {
    pub info: Option<CompanyInfo>,
    pub entries: Vec<FilingEntry>,
}

pub fn filing_index_url(cik: &str, form_type: &str, count: usize) -> Result<Url> {
    let url = Url::parse_with_params(
        BROWSE_EDGAR_URL,
        &[
            ("action", "getcompany"),
            ("CIK", cik),
            ("type", form_type),
            ("dateb", ""),
            ("owner", "include"),
            ("count", &count.to_string()),
            ("output", "atom"),
        ],
    )?;
    Ok(url)
}

fn child_text(node: Node, name: &str) -> Option<String> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_entry(node: Node) -> FilingEntry {
    let filing_date = child_text(node, "filing-date").and_then(|d| {
        NaiveDate::parse_from_str(&d, "%Y-%m-%d")
            .map_err(|e| log::debug!("Unparsable filing date {:?}: {}", d, e))
            .ok()
    });

    FilingEntry {
        accession_number: child_text(node, "accession-number"),
        filing_date,
        filing_href: child_text(node, "filing-href"),
        filing_type: child_text(node, "filing-type"),
        form_name: child_text(node, "form-name"),
        items_desc: child_text(node, "items-desc"),
    }
}

/// Parses an EDGAR `browse-edgar` Atom feed. Elements are matched by local
/// name, so the Atom default namespace does not matter.
pub fn parse_feed(xml: &str) -> Result<CompanyFeed> {
    // roxmltree only reads UTF-8 and EDGAR declares ISO-8859-1.
    let body = XML_DECLARATION.replace(xml, "");
    let doc = Document::parse(&body).context("Failed to parse filing feed XML")?;

    let info = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "company-info")
        .map(|node| CompanyInfo {
            cik: child_text(node, "cik"),
            conformed_name: child_text(node, "conformed-name"),
            fragment: body[node.range()].to_string(),
        });

    let entries = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "entry")
        .map(parse_entry)
        .collect();

    Ok(CompanyFeed { info, entries })
}
