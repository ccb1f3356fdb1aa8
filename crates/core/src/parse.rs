//! Parsing of free-form completion text into fixed-width content rows.
//!
//! The completion service is asked to answer with one row per line and
//! fields separated by `|||`. Nothing forces it to comply, so the parser
//! degrades step by step instead of failing:
//!
//! 1. lines containing the field separator,
//! 2. bullet or numbered lines,
//! 3. the first ~200 characters of the whole response.
//!
//! At most [`MAX_ROWS`] rows are returned and there is always at least one.

use crate::types::{ContentRow, SENTINEL};
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Field separator the instructions ask the model to use.
pub const FIELD_SEPARATOR: &str = "|||";

/// Maximum number of rows kept from one response.
pub const MAX_ROWS: usize = 10;

/// Number of characters kept when the response has no usable structure.
pub const TRUNCATE_CHARS: usize = 200;

/// Leading enumeration markers: `-`, `•`, `*`, `1.`, `2)`.
///
/// A marker only counts when whitespace or the end of the line follows it,
/// so values such as `-20%` or `1.5°C` keep their leading characters.
static ENUM_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-•*]+|\d+[.)])(?:\s+|$)").unwrap());

/// Lines that start with a bullet or a number followed by `.` or `)`.
static LIST_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-•*]+|\d+[.)])(?:\s|$)").unwrap());

/// Which rule produced the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseStrategy {
    /// Lines carried the field separator.
    Delimited,
    /// Only bullet or numbered lines were found.
    Bulleted,
    /// Nothing structured; the text was truncated into a single row.
    Truncated,
}

impl ParseStrategy {
    /// Whether the response failed to follow the requested format.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, ParseStrategy::Delimited)
    }
}

/// Rows together with the strategy that produced them.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Parsed rows, between 1 and [`MAX_ROWS`].
    pub rows: Vec<ContentRow>,
    /// Rule that matched.
    pub strategy: ParseStrategy,
}

/// Parser for completion output. Pure and infallible.
#[derive(Debug, Clone, Default)]
pub struct RowParser;

impl RowParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse raw text into rows.
    pub fn parse(&self, raw_text: &str) -> Vec<ContentRow> {
        self.parse_with_strategy(raw_text).rows
    }

    /// Parse raw text into rows, reporting which rule matched.
    pub fn parse_with_strategy(&self, raw_text: &str) -> ParseOutcome {
        let text = raw_text.replace("\r\n", "\n").replace('\r', "\n");

        let delimited: Vec<ContentRow> = text
            .lines()
            .map(str::trim)
            .filter(|line| line.contains(FIELD_SEPARATOR))
            .map(|line| split_fields(&strip_marker(line)))
            .filter(|row| !row_is_blank(row))
            .take(MAX_ROWS)
            .collect();
        if !delimited.is_empty() {
            return ParseOutcome {
                rows: delimited,
                strategy: ParseStrategy::Delimited,
            };
        }

        let bulleted: Vec<ContentRow> = text
            .lines()
            .map(str::trim)
            .filter(|line| LIST_LINE_REGEX.is_match(line))
            .map(strip_marker)
            .filter(|cleaned| !cleaned.is_empty())
            .map(|cleaned| ContentRow::from_fields([normalize_field(&cleaned)]))
            .take(MAX_ROWS)
            .collect();
        if !bulleted.is_empty() {
            log::debug!("No delimited lines; parsed {} list line(s)", bulleted.len());
            return ParseOutcome {
                rows: bulleted,
                strategy: ParseStrategy::Bulleted,
            };
        }

        let head: String = text.trim().chars().take(TRUNCATE_CHARS).collect();
        log::debug!("No structure found; keeping the first {} char(s)", TRUNCATE_CHARS);
        ParseOutcome {
            rows: vec![ContentRow::new(normalize_field(&head), SENTINEL, SENTINEL)],
            strategy: ParseStrategy::Truncated,
        }
    }
}

/// Remove a leading enumeration marker.
fn strip_marker(line: &str) -> String {
    ENUM_MARKER_REGEX.replace(line, "").trim().to_string()
}

/// Split a delimited line into a fixed-width row.
fn split_fields(line: &str) -> ContentRow {
    ContentRow::from_fields(line.split(FIELD_SEPARATOR).map(normalize_field))
}

/// Trim, NFC-normalize and collapse internal whitespace runs.
fn normalize_field(field: &str) -> String {
    field
        .nfc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn row_is_blank(row: &ContentRow) -> bool {
    row.fields().iter().all(|f| f.is_empty())
}
