use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::SEC_BASE_URL;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".gif", ".png"];

/// A row of the "Document Format Files" table on a filing detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub seq: Option<String>,
    pub description: String,
    pub doc_type: String,
    /// Absolute URL of the raw document.
    pub href: String,
}

impl DocumentLink {
    pub fn is_image(&self) -> bool {
        let href = self.href.to_ascii_lowercase();
        IMAGE_EXTENSIONS.iter().any(|ext| href.contains(ext))
    }
}

#[derive(Debug, Clone)]
pub struct DocumentTable {
    /// Outer HTML of the table, for when the model has to pick the link.
    pub html: String,
    pub links: Vec<DocumentLink>,
}

impl DocumentTable {
    /// The row whose type matches the filing form, e.g. `8-K`.
    pub fn primary_document(&self, form: &str) -> Option<&DocumentLink> {
        self.links
            .iter()
            .find(|l| l.doc_type.eq_ignore_ascii_case(form))
            .or_else(|| {
                self.links
                    .iter()
                    .find(|l| l.description.eq_ignore_ascii_case(form))
            })
    }

    /// Every linked document except images.
    pub fn text_documents(&self) -> impl Iterator<Item = &DocumentLink> {
        self.links.iter().filter(|l| !l.is_image())
    }
}

/// Resolves a detail-page href to the raw document URL. Inline XBRL viewer
/// links (`/ix?doc=/Archives/...`) are unwrapped.
pub fn resolve_link(href: &str) -> Option<String> {
    let href = href.trim();
    let href = href.strip_prefix("/ix?doc=").unwrap_or(href);
    let base = Url::parse(SEC_BASE_URL).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Locates the first `<table>` of a filing detail page and lists its links.
pub fn document_table(html: &str) -> Option<DocumentTable> {
    let document = Html::parse_document(html);
    let table = document.select(&TABLE).next()?;

    let mut links = Vec::new();
    for row in table.select(&ROW) {
        let Some(anchor) = row.select(&ANCHOR).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href").and_then(resolve_link) else {
            continue;
        };
        let cells: Vec<String> = row.select(&CELL).map(|c| cell_text(&c)).collect();

        links.push(DocumentLink {
            seq: cells.first().filter(|s| !s.is_empty()).cloned(),
            description: cells.get(1).cloned().unwrap_or_default(),
            doc_type: cells.get(3).cloned().unwrap_or_default(),
            href,
        });
    }

    Some(DocumentTable {
        html: table.html(),
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"<html><body>
<div id="formDiv"><table class="tableFile" summary="Document Format Files">
<tr><th scope="col">Seq</th><th scope="col">Description</th><th scope="col">Document</th><th scope="col">Type</th><th scope="col">Size</th></tr>
<tr><td scope="row">1</td><td scope="row">8-K</td><td scope="row"><a href="/ix?doc=/Archives/edgar/data/320193/000032019324000069/aapl-20240502.htm">aapl-20240502.htm</a> <span>iXBRL</span></td><td scope="row">8-K</td><td scope="row">41434</td></tr>
<tr class="evenRow"><td scope="row">2</td><td scope="row">EX-99.1</td><td scope="row"><a href="/Archives/edgar/data/320193/000032019324000069/a8-kex991.htm">a8-kex991.htm</a></td><td scope="row">EX-99.1</td><td scope="row">101</td></tr>
<tr><td scope="row">3</td><td scope="row">GRAPHIC</td><td scope="row"><a href="/Archives/edgar/data/320193/000032019324000069/logo.jpg">logo.jpg</a></td><td scope="row">GRAPHIC</td><td scope="row">9</td></tr>
</table></div>
<table class="tableFile" summary="Data Files"><tr><td>4</td><td>XBRL</td><td><a href="/Archives/x.xsd">x.xsd</a></td><td>EX-101.SCH</td></tr></table>
</body></html>"#;

    #[test]
    fn test_document_table_reads_first_table_only() {
        let table = document_table(DETAIL).unwrap();
        assert_eq!(table.links.len(), 3);
        assert!(table.html.contains("Document Format Files"));
        assert!(!table.html.contains("x.xsd"));
    }

    #[test]
    fn test_primary_document_unwraps_inline_viewer() {
        let table = document_table(DETAIL).unwrap();
        let primary = table.primary_document("8-K").unwrap();
        assert_eq!(
            primary.href,
            "https://www.sec.gov/Archives/edgar/data/320193/000032019324000069/aapl-20240502.htm"
        );
        assert_eq!(primary.seq.as_deref(), Some("1"));
    }

    #[test]
    fn test_text_documents_skip_images() {
        let table = document_table(DETAIL).unwrap();
        let docs: Vec<&str> = table.text_documents().map(|l| l.doc_type.as_str()).collect();
        assert_eq!(docs, vec!["8-K", "EX-99.1"]);
    }

    #[test]
    fn test_page_without_table() {
        assert!(document_table("<html><body><p>Not found</p></body></html>").is_none());
    }

    #[test]
    fn test_resolve_link_keeps_absolute_urls() {
        assert_eq!(
            resolve_link("https://example.com/doc.htm").as_deref(),
            Some("https://example.com/doc.htm")
        );
    }
}
