use chrono::NaiveDate;
use launchscan::edgar::index::filing_index_url;
use launchscan::edgar::tickers::{CompanyRecord, Ticker};
use launchscan::mock::{ScriptedGateway, StaticFetcher};
use launchscan::output::read_findings;
use launchscan::pipeline::FilingContent;
use launchscan::{ExtractionMode, FindingWriter, ScanConfig, Scanner, SkipReason};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const LAUNCH_DETAIL: &str = "https://www.sec.gov/Archives/edgar/data/42/000000004224000011/0000000042-24-000011-index.htm";
const EARNINGS_DETAIL: &str = "https://www.sec.gov/Archives/edgar/data/42/000000004224000007/0000000042-24-000007-index.htm";
const UPDATE_DETAIL: &str = "https://www.sec.gov/Archives/edgar/data/42/000000004224000003/0000000042-24-000003-index.htm";
const LAUNCH_DOC: &str = "https://www.sec.gov/Archives/edgar/data/42/000000004224000011/acme-20240301.htm";
const LAUNCH_EXHIBIT: &str = "https://www.sec.gov/Archives/edgar/data/42/000000004224000011/ex99-1.htm";
const LAUNCH_LOGO: &str = "https://www.sec.gov/Archives/edgar/data/42/000000004224000011/logo.jpg";
const UPDATE_DOC: &str = "https://www.sec.gov/Archives/edgar/data/42/000000004224000003/acme-20240201.htm";

const HEADER_LINE: &str =
    "company_name | stock_name | filing_time | new_product | product_description";

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {:?}: {}", path, e))
}

fn acme() -> CompanyRecord {
    CompanyRecord {
        ticker: Ticker::new("acme".to_string()).unwrap(),
        cik: "42".to_string(),
        title: "ACME WIDGETS INC".to_string(),
    }
}

fn feed_url() -> String {
    filing_index_url("42", "8-K", 300).unwrap().to_string()
}

fn full_fetcher(feed: &str) -> StaticFetcher {
    StaticFetcher::new()
        .with(feed_url(), feed)
        .with(LAUNCH_DETAIL, fixture("detail_launch.htm"))
        .with(EARNINGS_DETAIL, fixture("detail_launch.htm"))
        .with(UPDATE_DETAIL, fixture("detail_update.htm"))
        .with(LAUNCH_DOC, fixture("acme-20240301.htm"))
        .with(LAUNCH_EXHIBIT, fixture("ex99-1.htm"))
        .with(UPDATE_DOC, fixture("acme-20240201.htm"))
}

fn config(output: PathBuf, mode: ExtractionMode) -> ScanConfig {
    ScanConfig {
        output_path: output,
        mode,
        show_progress: false,
        ..ScanConfig::default()
    }
}

fn launch_gateway() -> ScriptedGateway {
    ScriptedGateway::new()
        .rule("look like an", &["yes"])
        .rule(
            "new product launches",
            &["The company launched the Acme Rocket, a reusable rocket."],
        )
        .rule("list the names of the products", &["Acme Rocket"])
        .rule(
            "very short description",
            &["A reusable rocket.", "A faster reusable rocket."],
        )
}

async fn run_scan(
    config: ScanConfig,
    fetcher: StaticFetcher,
    gateway: ScriptedGateway,
) -> Scanner<StaticFetcher, ScriptedGateway> {
    let writer = FindingWriter::create(&config.output_path).unwrap();
    let mut scanner = Scanner::new(config, fetcher, gateway, writer);
    scanner.run(&[acme()]).await.unwrap();
    scanner
}

#[tokio::test]
async fn test_truncate_mode_writes_one_row_per_filing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Truncate),
        full_fetcher(&fixture("feed.xml")),
        launch_gateway(),
    )
    .await;

    // Earnings-only filing never reaches the detail page.
    assert!(!scanner.fetcher().was_requested(EARNINGS_DETAIL));
    assert!(scanner.fetcher().was_requested(LAUNCH_DOC));
    assert!(!scanner.fetcher().was_requested(LAUNCH_EXHIBIT));

    let stats = scanner.stats().clone();
    assert_eq!(stats.companies, 1);
    assert_eq!(stats.filings_seen, 3);
    assert_eq!(stats.filings_matched, 2);
    assert_eq!(stats.skipped(SkipReason::ItemFilter), 1);
    assert_eq!(stats.findings, 2);
    assert_eq!(scanner.finish().unwrap().findings, 2);

    // Same product in two filings: two rows, no cross-filing dedupe.
    let findings = read_findings(&output).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].company_name, "Acme Widgets Inc.");
    assert_eq!(findings[0].ticker, "ACME");
    assert_eq!(findings[0].filing_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(findings[0].product_name, "Acme Rocket");
    assert_eq!(findings[0].product_description, "A reusable rocket.");
    assert_eq!(findings[1].filing_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_eq!(findings[1].product_description, "A faster reusable rocket.");

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().next(), Some(HEADER_LINE));
    assert_eq!(content.matches("company_name").count(), 1);
    assert_eq!(
        content.lines().nth(1),
        Some("Acme Widgets Inc. | ACME | 2024-03-01 | Acme Rocket | A reusable rocket.")
    );
}

#[tokio::test]
async fn test_filing_text_starts_at_form_marker() {
    let dir = tempdir().unwrap();
    let scanner = run_scan(
        config(dir.path().join("output.csv"), ExtractionMode::Truncate),
        full_fetcher(&fixture("feed.xml")),
        launch_gateway(),
    )
    .await;

    let prompts = scanner.gateway().prompts();
    let check = prompts
        .iter()
        .find(|p| p.contains("look like an"))
        .unwrap();
    assert!(check.contains("FORM 8-K CURRENT REPORT"));
    assert!(!check.contains("Washington"));
    assert!(!check.contains("not text"));
}

#[tokio::test]
async fn test_no_launch_writes_header_only() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let gateway = ScriptedGateway::new().rule("look like an", &["Yes."]);
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Truncate),
        full_fetcher(&fixture("feed.xml")),
        gateway,
    )
    .await;

    assert_eq!(scanner.stats().skipped(SkipReason::NoProducts), 2);
    assert_eq!(scanner.gateway().prompts_containing("very short description"), 0);
    scanner.finish().unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), format!("{}\n", HEADER_LINE));
}

#[tokio::test]
async fn test_rejected_filing_check_stops_the_filing() {
    let dir = tempdir().unwrap();
    let gateway = ScriptedGateway::new()
        .rule("look like an", &["<think>It is a cover page.</think>\nNo"])
        .rule("new product launches", &["Should never be asked."]);
    let scanner = run_scan(
        config(dir.path().join("output.csv"), ExtractionMode::Truncate),
        full_fetcher(&fixture("feed.xml")),
        gateway,
    )
    .await;

    assert_eq!(scanner.stats().skipped(SkipReason::NotFiling), 2);
    assert_eq!(scanner.gateway().prompts_containing("new product launches"), 0);
    assert_eq!(scanner.stats().findings, 0);
}

#[tokio::test]
async fn test_foreign_products_are_skipped() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let gateway = ScriptedGateway::new()
        .rule("look like an", &["yes"])
        .rule("new product launches", &["Acme launched a rocket and resells a gadget."])
        .rule("list the names of the products", &["- Acme Rocket\n- Partner Gadget"])
        .rule("product: Partner Gadget", &["NA"])
        .rule("very short description", &["A reusable rocket."]);
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Truncate),
        full_fetcher(&fixture("feed.xml")),
        gateway,
    )
    .await;

    assert_eq!(scanner.stats().skipped(SkipReason::NotCompanyProduct), 2);
    scanner.finish().unwrap();

    let findings = read_findings(&output).unwrap();
    assert_eq!(findings.len(), 2);
    assert!(findings.iter().all(|f| f.product_name == "Acme Rocket"));
    assert!(findings
        .iter()
        .all(|f| f.product_description != "NA" && f.product_name != "NA"));
}

#[tokio::test]
async fn test_unparsable_and_failed_replies_are_retried() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let gateway = ScriptedGateway::new()
        .rule("look like an", &["I think it might be one", "yes"])
        .rule("new product launches", &["The Acme Rocket launched."])
        .rule("list the names of the products", &["Acme Rocket"])
        .rule("very short description", &["A reusable rocket."])
        .failing_first(1);
    let mut cfg = config(output.clone(), ExtractionMode::Truncate);
    cfg.answer_attempts = 3;
    let scanner = run_scan(cfg, full_fetcher(&fixture("feed.xml")), gateway).await;

    // Crash, then a rambling reply, then "yes" for the first filing.
    assert_eq!(scanner.gateway().prompts_containing("look like an"), 4);
    assert_eq!(scanner.stats().findings, 2);
    scanner.finish().unwrap();
    assert_eq!(read_findings(&output).unwrap().len(), 2);
}

#[tokio::test]
async fn test_transport_failure_skips_filing_content() {
    let dir = tempdir().unwrap();
    let fetcher = StaticFetcher::new()
        .with(LAUNCH_DETAIL, fixture("detail_launch.htm"))
        .with(UPDATE_DETAIL, fixture("detail_update.htm"));
    let config = config(dir.path().join("output.csv"), ExtractionMode::Truncate);
    let writer = FindingWriter::create(&config.output_path).unwrap();
    let scanner = Scanner::new(config, fetcher, launch_gateway(), writer);

    // Detail page is there but the primary document is not.
    assert_eq!(scanner.extract_content(LAUNCH_DETAIL).await, None);
    assert!(scanner.fetcher().was_requested(LAUNCH_DOC));
    assert_eq!(scanner.extract_content(EARNINGS_DETAIL).await, None);
    assert_eq!(scanner.gateway().prompts().len(), 0);
}

#[tokio::test]
async fn test_unreachable_feed_skips_company() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Truncate),
        StaticFetcher::new(),
        launch_gateway(),
    )
    .await;

    assert_eq!(scanner.stats().skipped(SkipReason::Transport), 1);
    assert_eq!(scanner.stats().filings_seen, 0);
    scanner.finish().unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), format!("{}\n", HEADER_LINE));
}

#[tokio::test]
async fn test_company_name_falls_back_to_model() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let feed = fixture("feed.xml").replace("<conformed-name>Acme Widgets Inc.</conformed-name>", "");
    let gateway = launch_gateway().rule("company name", &["\"Acme Widgets, Inc.\""]);
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Truncate),
        full_fetcher(&feed),
        gateway,
    )
    .await;

    assert_eq!(scanner.gateway().prompts_containing("company name"), 1);
    scanner.finish().unwrap();
    let findings = read_findings(&output).unwrap();
    assert_eq!(findings[0].company_name, "Acme Widgets, Inc.");
}

#[tokio::test]
async fn test_unnamed_company_is_skipped() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let feed = fixture("feed.xml").replace("<conformed-name>Acme Widgets Inc.</conformed-name>", "");
    let gateway = ScriptedGateway::new()
        .rule("company name", &["NA"])
        .rule("look like an", &["yes"])
        .rule("new product launches", &["The Acme Rocket launched."])
        .rule("list the names of the products", &["Acme Rocket"])
        .rule("very short description", &["A reusable rocket."]);
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Truncate),
        full_fetcher(&feed),
        gateway,
    )
    .await;

    assert_eq!(scanner.gateway().prompts_containing("company name"), 1);
    assert_eq!(scanner.stats().skipped(SkipReason::MissingField), 1);
    assert_eq!(scanner.stats().filings_seen, 0);
    assert!(!scanner.fetcher().was_requested(LAUNCH_DETAIL));
    scanner.finish().unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), format!("{}\n", HEADER_LINE));
}

#[tokio::test]
async fn test_feed_without_company_info_uses_directory_title() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let full = fixture("feed.xml");
    let start = full.find("<company-info>").unwrap();
    let end = full.find("</company-info>").unwrap() + "</company-info>".len();
    let feed = format!("{}{}", &full[..start], &full[end..]);
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Truncate),
        full_fetcher(&feed),
        launch_gateway(),
    )
    .await;

    assert_eq!(scanner.gateway().prompts_containing("company name"), 0);
    scanner.finish().unwrap();

    let findings = read_findings(&output).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].company_name, "ACME WIDGETS INC");
}

fn excerpt_gateway() -> ScriptedGateway {
    ScriptedGateway::new()
        .rule("announce a new product launch", &["yes"])
        .rule("list the names of the products", &["Acme Rocket, acme rocket"])
        .rule("very short description", &["A reusable rocket."])
}

#[tokio::test]
async fn test_excerpt_mode_dedupes_products_within_a_filing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output.csv");
    let scanner = run_scan(
        config(output.clone(), ExtractionMode::Excerpts),
        full_fetcher(&fixture("feed.xml")),
        excerpt_gateway(),
    )
    .await;

    // Every linked text document is read, images are not.
    assert!(scanner.fetcher().was_requested(LAUNCH_DOC));
    assert!(scanner.fetcher().was_requested(LAUNCH_EXHIBIT));
    assert!(!scanner.fetcher().was_requested(LAUNCH_LOGO));

    let stats = scanner.stats().clone();
    assert!(stats.excerpts > 2);
    assert!(stats.skipped(SkipReason::Duplicate) > 0);
    assert_eq!(stats.findings, 2);
    assert_eq!(scanner.gateway().prompts_containing("very short description"), 2);
    assert_eq!(
        scanner.gateway().prompts_containing("announce a new product launch"),
        stats.excerpts
    );
    scanner.finish().unwrap();

    let findings = read_findings(&output).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].filing_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(findings[1].filing_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
}

#[tokio::test]
async fn test_excerpt_mode_drops_filing_when_a_document_is_missing() {
    let dir = tempdir().unwrap();
    let fetcher = StaticFetcher::new()
        .with(feed_url(), fixture("feed.xml"))
        .with(LAUNCH_DETAIL, fixture("detail_launch.htm"))
        .with(LAUNCH_DOC, fixture("acme-20240301.htm"))
        .with(UPDATE_DETAIL, fixture("detail_update.htm"))
        .with(UPDATE_DOC, fixture("acme-20240201.htm"));
    let scanner = run_scan(
        config(dir.path().join("output.csv"), ExtractionMode::Excerpts),
        fetcher,
        excerpt_gateway(),
    )
    .await;

    assert_eq!(scanner.stats().skipped(SkipReason::Transport), 1);
    assert_eq!(scanner.stats().filings_extracted, 1);
    assert_eq!(scanner.stats().findings, 1);
}

#[tokio::test]
async fn test_model_picks_document_when_no_row_matches_form() {
    let dir = tempdir().unwrap();
    let fetcher = StaticFetcher::new()
        .with(LAUNCH_DETAIL, fixture("detail_amended.htm"))
        .with(LAUNCH_DOC, fixture("acme-20240301.htm"));
    let reply = format!("The document is at {}.", LAUNCH_DOC);
    let gateway = ScriptedGateway::new()
        .rule("link in this HTML table", &[reply.as_str()])
        .rule("look like an", &["yes"]);
    let config = config(dir.path().join("output.csv"), ExtractionMode::Truncate);
    let writer = FindingWriter::create(&config.output_path).unwrap();
    let scanner = Scanner::new(config, fetcher, gateway, writer);

    let content = scanner.extract_content(LAUNCH_DETAIL).await;
    match content {
        Some(FilingContent::Document(text)) => assert!(text.starts_with("FORM 8-K")),
        other => panic!("expected document text, got {:?}", other),
    }
    assert_eq!(scanner.gateway().prompts_containing("link in this HTML table"), 1);
    assert!(scanner.fetcher().was_requested(LAUNCH_DOC));
}

#[tokio::test]
async fn test_model_without_document_link_skips_filing() {
    let dir = tempdir().unwrap();
    let fetcher = StaticFetcher::new()
        .with(LAUNCH_DETAIL, fixture("detail_amended.htm"))
        .with(LAUNCH_DOC, fixture("acme-20240301.htm"));
    let config = config(dir.path().join("output.csv"), ExtractionMode::Truncate);
    let writer = FindingWriter::create(&config.output_path).unwrap();
    let scanner = Scanner::new(config, fetcher, ScriptedGateway::new(), writer);

    assert_eq!(scanner.extract_content(LAUNCH_DETAIL).await, None);
    assert!(!scanner.fetcher().was_requested(LAUNCH_DOC));
}

#[tokio::test]
async fn test_model_listed_links_skip_images() {
    let dir = tempdir().unwrap();
    let fetcher = StaticFetcher::new()
        .with(LAUNCH_DETAIL, fixture("detail_images.htm"))
        .with(LAUNCH_EXHIBIT, fixture("ex99-1.htm"))
        .with(LAUNCH_LOGO, "\u{ff}\u{d8}binary");
    let listed = format!("{}, {}", LAUNCH_LOGO, LAUNCH_EXHIBIT);
    let gateway = ScriptedGateway::new().rule("every document link", &[listed.as_str()]);
    let config = config(dir.path().join("output.csv"), ExtractionMode::Excerpts);
    let writer = FindingWriter::create(&config.output_path).unwrap();
    let scanner = Scanner::new(config, fetcher, gateway, writer);

    let content = scanner.extract_content(LAUNCH_DETAIL).await;
    match content {
        Some(FilingContent::Excerpts(excerpts)) => {
            assert!(!excerpts.is_empty());
            assert!(excerpts.iter().all(|e| !e.contains("binary")));
        }
        other => panic!("expected excerpts, got {:?}", other),
    }
    assert_eq!(scanner.gateway().prompts_containing("every document link"), 1);
    assert!(scanner.fetcher().was_requested(LAUNCH_EXHIBIT));
    assert!(!scanner.fetcher().was_requested(LAUNCH_LOGO));
}
