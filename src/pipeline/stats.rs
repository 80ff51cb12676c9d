use std::collections::BTreeMap;
use std::fmt;
use strum::Display;

/// Why a company, filing, excerpt or product was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Network failure, non-2xx status or empty body.
    Transport,
    /// Expected feed, table or document structure missing.
    Parse,
    /// `<items-desc>` lacks every watched item code.
    ItemFilter,
    /// Filing date, filing link or company name missing.
    MissingField,
    /// No document link in the filing's table.
    NoDocument,
    /// Model did not confirm the document is the filing.
    NotFiling,
    /// No keyword occurrences in any document.
    NoExcerpts,
    /// Model found no product launch.
    NoProducts,
    /// Model declined to describe the product as the company's.
    NotCompanyProduct,
    /// Product already reported for this filing.
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub companies: usize,
    pub filings_seen: usize,
    pub filings_matched: usize,
    pub filings_extracted: usize,
    pub excerpts: usize,
    pub findings: usize,
    pub skips: BTreeMap<SkipReason, usize>,
}

impl RunStats {
    pub fn skip(&mut self, reason: SkipReason) {
        *self.skips.entry(reason).or_insert(0) += 1;
    }

    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skips.get(&reason).copied().unwrap_or(0)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "companies scanned:  {}", self.companies)?;
        writeln!(f, "filings seen:       {}", self.filings_seen)?;
        writeln!(f, "passed item filter: {}", self.filings_matched)?;
        writeln!(f, "content extracted:  {}", self.filings_extracted)?;
        if self.excerpts > 0 {
            writeln!(f, "excerpts examined:  {}", self.excerpts)?;
        }
        write!(f, "findings written:   {}", self.findings)?;
        for (reason, count) in &self.skips {
            write!(f, "\n  skipped ({}): {}", reason, count)?;
        }
        Ok(())
    }
}
