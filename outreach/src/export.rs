use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;

use crate::models::SearchResult;

pub const CSV_HEADER: [&str; 4] = ["query", "title", "link", "subtitle"];

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex compile"));

/// A search result flattened for display and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub title: String,
    pub link: String,
    pub subtitle: String,
}

impl From<&SearchResult> for ResultRow {
    fn from(result: &SearchResult) -> Self {
        Self {
            title: result
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled result".to_string()),
            link: result.link.clone().unwrap_or_default(),
            subtitle: result.snippet.clone().unwrap_or_default(),
        }
    }
}

/// CSV document with the header row and one line per result, each prefixed
/// with the query that produced it. Lines end in CRLF.
pub fn to_csv(query: &str, rows: &[ResultRow]) -> String {
    let mut out = String::new();
    push_record(&mut out, &CSV_HEADER);
    for row in rows {
        push_record(
            &mut out,
            &[query, row.title.as_str(), row.link.as_str(), row.subtitle.as_str()],
        );
    }
    out
}

fn push_record(out: &mut String, fields: &[&str]) {
    let line = fields
        .iter()
        .map(|f| quote_field(f))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn quote_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// `outreach_<query>_<YYYYMMDD-HHMM>.csv` with the query made filename-safe.
pub fn export_filename(query: &str, now: DateTime<Utc>) -> String {
    format!(
        "outreach_{}_{}.csv",
        safe_query(query),
        now.format("%Y%m%d-%H%M")
    )
}

fn safe_query(query: &str) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(query, "_");
    let truncated: String = replaced.chars().take(60).collect();
    if truncated.is_empty() {
        "results".to_string()
    } else {
        truncated
    }
}
