//! Record store abstraction and its backends
//!
//! Every backend implements [`RecordStore`]; callers receive a store object
//! (usually from [`open_store`]) instead of reaching for a global handle.
//!
//! - `memory` - vector behind a mutex, nothing persisted
//! - `csv` - whole-file load, mutate, rewrite per operation
//! - `sqlite` - `books` table through an sqlx pool

mod collection;
mod csv_file;
mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use tracing::info;

use crate::config::{Backend, StoreConfig};
use crate::error::Result;
use crate::models::{Book, BookUpdate, NewBook, NumericField, Pagination};
use crate::query::{BookQuery, Filter, Sort, SortKey};

pub use self::csv_file::{CsvStore, CSV_HEADER};
pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;

/// CRUD + query capability set shared by all backends.
///
/// Each call is one complete request: it has finished (and persisted, for the
/// file and table backends) by the time the future resolves.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> Backend;

    /// Validate and insert a book, assigning `max(id) + 1` (or 1).
    async fn add(&self, book: NewBook) -> Result<Book>;

    /// Insert a batch. All-or-nothing: the first invalid or colliding entry
    /// aborts the batch and nothing is written. Returns the number added.
    async fn add_many(&self, books: Vec<NewBook>) -> Result<usize>;

    /// Fetch a book by id, failing with `NotFound`.
    async fn get(&self, id: i64) -> Result<Book>;

    /// Change several fields of an existing book as one request. Every update
    /// is checked (bounds, isbn collisions) before any is applied, so a
    /// failure leaves the book unchanged. An empty list is `InvalidArgument`.
    async fn update_many(&self, id: i64, updates: Vec<BookUpdate>) -> Result<Book>;

    /// Remove a book, failing with `NotFound` (store unchanged) if absent.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Every book in storage order.
    async fn list_all(&self) -> Result<Vec<Book>>;

    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>>;

    async fn exists(&self, filter: &Filter) -> Result<bool>;

    async fn count(&self) -> Result<usize>;

    /// Average of a numeric field; `None` when there are no books.
    async fn average(&self, field: NumericField) -> Result<Option<f64>>;

    /// Change one field of an existing book and return the updated record.
    async fn update(&self, id: i64, update: BookUpdate) -> Result<Book> {
        self.update_many(id, vec![update]).await
    }

    async fn update_price(&self, id: i64, price: f64) -> Result<Book> {
        self.update(id, BookUpdate::Price(price)).await
    }

    async fn mark_in_stock(&self, id: i64) -> Result<Book> {
        self.update(id, BookUpdate::InStock(true)).await
    }

    async fn mark_out_of_stock(&self, id: i64) -> Result<Book> {
        self.update(id, BookUpdate::InStock(false)).await
    }

    async fn title_exists(&self, title: &str) -> Result<bool> {
        self.exists(&Filter::TitleEq(title.to_owned())).await
    }

    /// Books by an author, ordered by title.
    async fn books_by_author(&self, author: &str) -> Result<Vec<Book>> {
        let query = BookQuery::new()
            .filter(Filter::AuthorEq(author.to_owned()))
            .sort(Sort::asc(SortKey::Title));
        self.find(&query).await
    }

    /// Books strictly cheaper than `max_price`, cheapest first.
    async fn cheaper_than(&self, max_price: f64) -> Result<Vec<Book>> {
        let query = BookQuery::new()
            .filter(Filter::PriceBelow(max_price))
            .sort(Sort::asc(SortKey::Price));
        self.find(&query).await
    }

    /// Books with at least `min_pages` pages, longest first.
    async fn long_books(&self, min_pages: i32) -> Result<Vec<Book>> {
        let query = BookQuery::new()
            .filter(Filter::PagesAtLeast(min_pages))
            .sort(Sort::desc(SortKey::Pages));
        self.find(&query).await
    }

    async fn search_titles(&self, keyword: &str) -> Result<Vec<Book>> {
        let query = BookQuery::new().filter(Filter::TitleContains(keyword.to_owned()));
        self.find(&query).await
    }

    /// Books priced within `[min, max]`, cheapest first.
    async fn in_price_range(&self, min: f64, max: f64) -> Result<Vec<Book>> {
        let query = BookQuery::new()
            .filter(Filter::PriceBetween { min, max })
            .sort(Sort::asc(SortKey::Price));
        self.find(&query).await
    }

    async fn most_expensive(&self) -> Result<Option<Book>> {
        let query = BookQuery::new()
            .sort(Sort::desc(SortKey::Price))
            .paginate(Pagination::new(1, 1)?);
        Ok(self.find(&query).await?.into_iter().next())
    }

    async fn cheapest(&self) -> Result<Option<Book>> {
        let query = BookQuery::new()
            .sort(Sort::asc(SortKey::Price))
            .paginate(Pagination::new(1, 1)?);
        Ok(self.find(&query).await?.into_iter().next())
    }

    async fn sorted_by_length(&self, ascending: bool) -> Result<Vec<Book>> {
        let sort = if ascending {
            Sort::asc(SortKey::Pages)
        } else {
            Sort::desc(SortKey::Pages)
        };
        self.find(&BookQuery::new().sort(sort)).await
    }

    /// One page of books in id order. `page_number` is 1-based.
    async fn page(&self, page_number: u32, page_size: u32) -> Result<Vec<Book>> {
        let query = BookQuery::new()
            .sort(Sort::asc(SortKey::Id))
            .paginate(Pagination::new(page_number, page_size)?);
        self.find(&query).await
    }

    async fn available(&self) -> Result<Vec<Book>> {
        self.find(&BookQuery::new().filter(Filter::InStock(true)))
            .await
    }
}

/// Open the backend named by the configuration.
pub async fn open_store(config: &StoreConfig) -> Result<Box<dyn RecordStore>> {
    info!(backend = %config.backend, "opening record store");

    let store: Box<dyn RecordStore> = match config.backend {
        Backend::Memory => Box::new(MemoryStore::new()),
        Backend::Csv => Box::new(CsvStore::open(&config.csv_path)),
        Backend::Sqlite => Box::new(SqliteStore::open(&config.database_url).await?),
    };

    Ok(store)
}

/// Creation timestamp, truncated to milliseconds so it survives every
/// backend's text encoding unchanged.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
