pub mod filing;
pub mod index;
pub mod parsing;
pub mod tickers;
pub mod utils;

// Hardcoded values
pub const SEC_BASE_URL: &str = "https://www.sec.gov";
pub const TICKER_URL: &str = "https://www.sec.gov/files/company_tickers.json";
pub const BROWSE_EDGAR_URL: &str = "https://www.sec.gov/cgi-bin/browse-edgar";
pub const USER_AGENT: &str = "launchscan software@example.com";

pub const FORM_8K: &str = "8-K";
pub const FEED_COUNT: usize = 300;

/// Items 8.01 (other events), 9.01 (exhibits) and 8.02 are where product
/// announcements usually land.
pub const ITEM_CODES: &[&str] = &["8.01", "9.01", "8.02"];
