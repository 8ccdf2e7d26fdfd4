//! CsvStore - file-backed record store
//!
//! Every operation loads the whole file, works on the in-memory collection and,
//! if something changed, rewrites the whole file. The rewrite goes to a sibling
//! `.tmp` file first and is renamed over the live file, so an interrupted write
//! leaves the previous contents in place.
//!
//! Column layout: `id,title,author,pages,price` followed by
//! `isbn,publication_year,in_stock,created_at`. Files with only the first five
//! columns load with defaults for the rest.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::collection::BookCollection;
use super::{now, RecordStore};
use crate::config::Backend;
use crate::error::{Result, StoreError};
use crate::models::{Book, BookUpdate, NewBook, NumericField};
use crate::query::{BookQuery, Filter};

/// Header row written to every file.
pub const CSV_HEADER: [&str; 9] = [
    "id",
    "title",
    "author",
    "pages",
    "price",
    "isbn",
    "publication_year",
    "in_stock",
    "created_at",
];

pub struct CsvStore {
    path: PathBuf,
    /// Serializes load-mutate-save cycles within this process.
    lock: Mutex<()>,
}

impl CsvStore {
    /// Point a store at a file. The file is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "using CSV record store");
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BookCollection> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no CSV file yet, starting empty");
                return Ok(BookCollection::default());
            }
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };

        let books = parse_books(&self.path, &bytes)?;
        debug!(count = books.len(), "loaded books from CSV");
        Ok(BookCollection::new(books))
    }

    async fn save(&self, books: &BookCollection) -> Result<()> {
        let bytes = render_books(&self.path, books.books())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        debug!(count = books.len(), path = %self.path.display(), "wrote books to CSV");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn parse_books(path: &Path, bytes: &[u8]) -> Result<Vec<Book>> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize::<Book>()
        .map(|row| row.map_err(|e| StoreError::csv(path, e)))
        .collect()
}

fn render_books(path: &Path, books: &[Book]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| StoreError::csv(path, e))?;
    for book in books {
        writer.serialize(book).map_err(|e| StoreError::csv(path, e))?;
    }

    writer
        .into_inner()
        .map_err(|e| StoreError::io(path, io::Error::new(e.error().kind(), e.to_string())))
}

#[async_trait]
impl RecordStore for CsvStore {
    fn backend(&self) -> Backend {
        Backend::Csv
    }

    async fn add(&self, book: NewBook) -> Result<Book> {
        let _guard = self.lock.lock().await;
        let mut books = self.load().await?;
        let book = books.insert(book, now())?;
        self.save(&books).await?;
        debug!(id = book.id, "book added");
        Ok(book)
    }

    async fn add_many(&self, batch: Vec<NewBook>) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut books = self.load().await?;
        let added = books.insert_all(batch, now())?;
        self.save(&books).await?;
        debug!(added, "books added");
        Ok(added)
    }

    async fn get(&self, id: i64) -> Result<Book> {
        let _guard = self.lock.lock().await;
        self.load().await?.get(id).cloned()
    }

    async fn update_many(&self, id: i64, updates: Vec<BookUpdate>) -> Result<Book> {
        let _guard = self.lock.lock().await;
        let fields = updates.len();
        let mut books = self.load().await?;
        let book = books.update_all(id, updates)?;
        self.save(&books).await?;
        debug!(id, fields, "book updated");
        Ok(book)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut books = self.load().await?;
        books.remove(id)?;
        self.save(&books).await?;
        debug!(id, "book deleted");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.books().to_vec())
    }

    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.find(query))
    }

    async fn exists(&self, filter: &Filter) -> Result<bool> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.exists(filter))
    }

    async fn count(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len())
    }

    async fn average(&self, field: NumericField) -> Result<Option<f64>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.average(field))
    }
}
