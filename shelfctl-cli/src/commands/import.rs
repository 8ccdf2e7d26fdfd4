//! Import command - bulk add from a CSV file
//!
//! Input columns: `title,author,pages,price` with optional `isbn` and
//! `publication_year`. The whole file is added or nothing is.

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use shelfctl_core::{NewBook, RecordStore};
use std::path::{Path, PathBuf};
use tracing::info;

use super::output::OutputFormat;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV file with a header row (title,author,pages,price[,isbn,publication_year])
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ImportRow {
    title: String,
    author: String,
    pages: i32,
    price: f64,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
}

impl From<ImportRow> for NewBook {
    fn from(row: ImportRow) -> Self {
        let mut book = NewBook::new(row.title, row.author, row.pages, row.price);
        book.isbn = row.isbn.filter(|isbn| !isbn.is_empty());
        book.publication_year = row.publication_year;
        book
    }
}

fn read_rows(path: &Path) -> Result<Vec<NewBook>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open import file: {:?}", path))?;

    reader
        .deserialize::<ImportRow>()
        .enumerate()
        .map(|(i, row)| {
            // +2: 1-based, after the header
            row.map(NewBook::from)
                .context(format!("Invalid row {} in {:?}", i + 2, path))
        })
        .collect()
}

pub async fn run_import(store: &dyn RecordStore, args: ImportArgs, format: OutputFormat) -> Result<()> {
    let books = read_rows(&args.file)?;
    let added = store
        .add_many(books)
        .await
        .context(format!("Import of {:?} failed, nothing was added", args.file))?;

    info!(added, file = %args.file.display(), "import complete");
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "imported": added })),
        OutputFormat::Quiet => println!("{}", added),
        OutputFormat::Human => println!("Imported {} books", added),
    }
    Ok(())
}
