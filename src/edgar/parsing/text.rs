use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Words that tend to sit next to a product announcement. Matched
/// case-sensitively.
pub const KEYWORDS: &[&str] = &[
    "announced",
    "new",
    "product",
    "launch",
    "launched",
    "release",
    "version",
];

/// Characters of context kept on each side of a keyword.
pub const WINDOW: usize = 80;

static SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));
static STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid regex"));
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static FORM_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"FORM\s+8-K").expect("valid regex"));

/// Strips markup from an HTML or text document and flattens it to a single
/// line.
pub fn html_to_text(content: &str) -> String {
    let mut text = SCRIPT.replace_all(content, " ").into_owned();
    text = STYLE.replace_all(&text, " ").into_owned();
    text = COMMENT.replace_all(&text, " ").into_owned();

    // Tags become spaces so adjacent cells and paragraphs keep apart.
    text = TAG.replace_all(&text, " ").into_owned();
    text = decode_html_entities(&text).into_owned();

    // NFKC also folds non-breaking spaces into plain ones.
    text = text.nfkc().collect::<String>();
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Drops everything before the first `FORM 8-K` marker. Text without the
/// marker is returned whole.
pub fn truncate_at_marker(text: &str) -> &str {
    match FORM_MARKER.find(text) {
        Some(m) => &text[m.start()..],
        None => {
            log::debug!("No FORM 8-K marker, keeping the whole document");
            text
        }
    }
}

/// At most `limit` characters from the start of `text`.
pub fn clip_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn window_around(text: &str, start: usize, end: usize, window: usize) -> &str {
    let from = if window == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(window - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let to = text[end..]
        .char_indices()
        .nth(window)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    &text[from..to]
}

/// For every keyword, every literal occurrence with up to `window`
/// characters on each side, clipped at the text bounds. Results are grouped
/// by keyword, in keyword order, then by position.
pub fn keyword_windows<S: AsRef<str>>(text: &str, keywords: &[S], window: usize) -> Vec<String> {
    let mut excerpts = Vec::new();
    for keyword in keywords {
        let keyword = keyword.as_ref();
        if keyword.is_empty() {
            continue;
        }
        for (start, matched) in text.match_indices(keyword) {
            let end = start + matched.len();
            excerpts.push(window_around(text, start, end, window).to_string());
        }
    }
    excerpts
}
