use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, Trim, Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 5] = [
    "company_name",
    "stock_name",
    "filing_time",
    "new_product",
    "product_description",
];

/// One accepted product announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFinding {
    pub company_name: String,
    pub ticker: String,
    pub filing_date: NaiveDate,
    pub product_name: String,
    pub product_description: String,
}

impl ProductFinding {
    /// Free-text fields are flattened to one line.
    pub fn new(
        company_name: &str,
        ticker: &str,
        filing_date: NaiveDate,
        product_name: &str,
        product_description: &str,
    ) -> Self {
        Self {
            company_name: one_line(company_name),
            ticker: one_line(ticker),
            filing_date,
            product_name: one_line(product_name),
            product_description: one_line(product_description),
        }
    }

    fn fields(&self) -> [String; 5] {
        [
            self.company_name.clone(),
            self.ticker.clone(),
            self.filing_date.format("%Y-%m-%d").to_string(),
            self.product_name.clone(),
            self.product_description.clone(),
        ]
    }
}

fn one_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pads fields so a `|`-delimited record reads `a | b | c`.
fn padded<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    let last = fields.len().saturating_sub(1);
    fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let f = f.as_ref();
            match (i == 0, i == last) {
                (true, true) => f.to_string(),
                (true, false) => format!("{} ", f),
                (false, true) => format!(" {}", f),
                (false, false) => format!(" {} ", f),
            }
        })
        .collect()
}

/// Writes findings as ` | `-separated rows.
///
/// The file is truncated and given its header on creation, then held open
/// for the whole run. Each row is flushed before `append` returns, so an
/// interrupted run keeps every row written so far. Values containing `|`,
/// quotes or line breaks are quoted with CSV rules.
pub struct FindingWriter {
    writer: Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl FindingWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {:?}", path))?;

        let mut writer = WriterBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(file);
        writer.write_record(padded(&HEADER))?;
        writer.flush()?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn append(&mut self, finding: &ProductFinding) -> Result<()> {
        self.writer.write_record(padded(&finding.fields()))?;
        self.writer.flush()?;
        self.rows += 1;
        log::debug!("Wrote finding #{} to {:?}", self.rows, self.path);
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

/// Reads a findings file back, checking the header.
pub fn read_findings(path: &Path) -> Result<Vec<ProductFinding>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open findings file {:?}", path))?;

    let headers = reader.headers()?.clone();
    if headers.iter().ne(HEADER.iter().copied()) {
        return Err(anyhow!("Unexpected header in {:?}: {:?}", path, headers));
    }

    let mut findings = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != HEADER.len() {
            return Err(anyhow!(
                "Expected {} fields, found {} at {:?}",
                HEADER.len(),
                record.len(),
                record.position()
            ));
        }
        let filing_date = NaiveDate::parse_from_str(&record[2], "%Y-%m-%d")
            .with_context(|| format!("Invalid filing date {:?}", &record[2]))?;
        findings.push(ProductFinding {
            company_name: record[0].to_string(),
            ticker: record[1].to_string(),
            filing_date,
            product_name: record[3].to_string(),
            product_description: record[4].to_string(),
        });
    }
    Ok(findings)
}
