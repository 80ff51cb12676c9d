//! Strict readers for model replies.
//!
//! Every question tells the model which reply shapes are allowed. Replies are
//! cleaned (reasoning blocks, quotes, whitespace) and then parsed into an
//! [`Answer`]; anything that does not fit the shape is `Unparsable` rather
//! than silently read as yes or no.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

static THINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>()\[\],]+"#).expect("valid regex"));
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    Value(T),
    /// The model used the agreed "nothing here" marker.
    Absent,
    /// Reply did not match the requested shape; carries the cleaned reply.
    Unparsable(String),
}

impl<T> Answer<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Answer::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Removes `<think>` blocks emitted by reasoning models, surrounding quotes
/// and whitespace.
pub fn clean(raw: &str) -> String {
    let without_reasoning = THINK.replace_all(raw, "");
    without_reasoning
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

pub fn is_absent_marker(reply: &str) -> bool {
    let token = reply
        .trim()
        .trim_end_matches(|c: char| c == '.' || c == '!')
        .trim_matches(|c: char| c == '"' || c == '\'');
    ["na", "n/a", "none"]
        .iter()
        .any(|marker| token.eq_ignore_ascii_case(marker))
}

/// Free text, or the `NA` marker.
pub fn parse_text(raw: &str) -> Answer<String> {
    let reply = clean(raw);
    if reply.is_empty() {
        return Answer::Unparsable(reply);
    }
    if is_absent_marker(&reply) {
        return Answer::Absent;
    }
    Answer::Value(reply)
}

/// Exactly `yes` or `no`, in any case, with trailing punctuation ignored.
pub fn parse_yes_no(raw: &str) -> Answer<bool> {
    let reply = clean(raw);
    let token = reply
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_ascii_lowercase();
    match token.as_str() {
        "yes" => Answer::Value(true),
        "no" => Answer::Value(false),
        _ => Answer::Unparsable(reply),
    }
}

/// Comma or newline separated names, or the `NA` marker. Bullets and
/// numbering are stripped, `NA` items dropped and duplicates removed.
pub fn parse_list(raw: &str) -> Answer<Vec<String>> {
    let reply = clean(raw);
    if reply.is_empty() {
        return Answer::Unparsable(reply);
    }
    if is_absent_marker(&reply) {
        return Answer::Absent;
    }
    let items: Vec<String> = reply
        .split(|c: char| c == ',' || c == '\n' || c == ';')
        .map(|item| BULLET.replace(item, "").trim().trim_end_matches('.').trim().to_string())
        .filter(|item| !item.is_empty() && !is_absent_marker(item))
        .unique_by(|item| item.to_lowercase())
        .collect();
    if items.is_empty() {
        Answer::Absent
    } else {
        Answer::Value(items)
    }
}

/// First `http(s)://` URL in the reply, or the `NA` marker.
pub fn parse_link(raw: &str) -> Answer<String> {
    let reply = clean(raw);
    if is_absent_marker(&reply) {
        return Answer::Absent;
    }
    match URL.find(&reply) {
        Some(m) => Answer::Value(m.as_str().trim_end_matches(['.', ',']).to_string()),
        None => Answer::Unparsable(reply),
    }
}

/// Every `http(s)://` URL in the reply, or the `NA` marker.
pub fn parse_links(raw: &str) -> Answer<Vec<String>> {
    let reply = clean(raw);
    if is_absent_marker(&reply) {
        return Answer::Absent;
    }
    let links: Vec<String> = URL
        .find_iter(&reply)
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
        .unique()
        .collect();
    if links.is_empty() {
        Answer::Unparsable(reply)
    } else {
        Answer::Value(links)
    }
}
