pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod store;

pub use config::{Backend, ShelfConfig, StoreConfig};
pub use error::{Result, StoreError};
pub use models::{
    Book, BookUpdate, NewBook, NumericField, Pagination, ValidationError, DEFAULT_PER_PAGE,
};
pub use query::{BookQuery, Filter, Sort, SortKey, SortOrder};
pub use store::{open_store, CsvStore, MemoryStore, RecordStore, SqliteStore, CSV_HEADER};
