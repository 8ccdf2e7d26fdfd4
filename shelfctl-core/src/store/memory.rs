//! MemoryStore - vector-backed record store for tests and scratch use.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::collection::BookCollection;
use super::{now, RecordStore};
use crate::config::Backend;
use crate::error::Result;
use crate::models::{Book, BookUpdate, NewBook, NumericField};
use crate::query::{BookQuery, Filter};

/// In-memory record store. Clone-friendly via Arc; clones share the books.
#[derive(Clone, Default)]
pub struct MemoryStore {
    books: Arc<Mutex<BookCollection>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    async fn add(&self, book: NewBook) -> Result<Book> {
        let book = self.books.lock().await.insert(book, now())?;
        debug!(id = book.id, "book added");
        Ok(book)
    }

    async fn add_many(&self, books: Vec<NewBook>) -> Result<usize> {
        let added = self.books.lock().await.insert_all(books, now())?;
        debug!(added, "books added");
        Ok(added)
    }

    async fn get(&self, id: i64) -> Result<Book> {
        self.books.lock().await.get(id).cloned()
    }

    async fn update_many(&self, id: i64, updates: Vec<BookUpdate>) -> Result<Book> {
        let fields = updates.len();
        let book = self.books.lock().await.update_all(id, updates)?;
        debug!(id, fields, "book updated");
        Ok(book)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.books.lock().await.remove(id)?;
        debug!(id, "book deleted");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        Ok(self.books.lock().await.books().to_vec())
    }

    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>> {
        Ok(self.books.lock().await.find(query))
    }

    async fn exists(&self, filter: &Filter) -> Result<bool> {
        Ok(self.books.lock().await.exists(filter))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.books.lock().await.len())
    }

    async fn average(&self, field: NumericField) -> Result<Option<f64>> {
        Ok(self.books.lock().await.average(field))
    }
}
