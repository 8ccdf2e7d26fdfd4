//! Rendering of command results
//!
//! Human output is one `ID: ... | title: ...` line per book. JSON output is
//! pretty-printed `serde_json`. Quiet output prints ids only.

use anyhow::Result;
use serde::Serialize;
use shelfctl_core::{Book, NumericField};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output
    Json,
    /// Ids only, one per line
    Quiet,
}

impl OutputFormat {
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            Self::Json
        } else if quiet {
            Self::Quiet
        } else {
            Self::Human
        }
    }
}

pub fn render_book(format: OutputFormat, book: &Book) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(book)?,
        OutputFormat::Quiet => book.id.to_string(),
        OutputFormat::Human => book.to_string(),
    })
}

pub fn render_books(format: OutputFormat, books: &[Book]) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(books)?,
        OutputFormat::Quiet => books
            .iter()
            .map(|b| b.id.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Human if books.is_empty() => "(no books)".to_string(),
        OutputFormat::Human => books
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// A single-book query that may find nothing (cheapest, priciest)
pub fn render_optional_book(format: OutputFormat, book: Option<&Book>) -> Result<String> {
    match (format, book) {
        (_, Some(book)) => render_book(format, book),
        (OutputFormat::Json, None) => Ok("null".to_string()),
        (OutputFormat::Quiet, None) => Ok(String::new()),
        (OutputFormat::Human, None) => Ok("(no books)".to_string()),
    }
}

pub fn render_average(format: OutputFormat, field: NumericField, avg: Option<f64>) -> Result<String> {
    Ok(match (format, avg) {
        (OutputFormat::Json, avg) => serde_json::to_string(&avg)?,
        (_, None) => "no data".to_string(),
        (OutputFormat::Quiet, Some(avg)) => format!("{:.2}", avg),
        (OutputFormat::Human, Some(avg)) => format!("average {}: {:.2}", field.column(), avg),
    })
}

/// Plain scalar results (count, exists)
pub fn render_value<T: Serialize + ToString>(format: OutputFormat, value: &T) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        _ => value.to_string(),
    })
}

pub fn print(rendered: String) {
    if !rendered.is_empty() {
        println!("{}", rendered);
    }
}
