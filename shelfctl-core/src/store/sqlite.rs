//! SqliteStore - table-backed record store
//!
//! Handles book CRUD with these patterns:
//! - add / add_many: id computed and row inserted in one transaction
//! - isbn uniqueness: rely on the unique index, map the violation (no check-then-insert)
//! - find: one query built from the `BookQuery`, filters bound as parameters

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::{now, RecordStore};
use crate::config::Backend;
use crate::error::{Result, StoreError};
use crate::models::{Book, BookUpdate, NewBook, NumericField};
use crate::query::{BookQuery, Filter};

/// Default maximum connections for the pool.
/// Kept low for single-user tooling.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const COLUMNS: &str =
    "id, title, author, pages, price, isbn, publication_year, in_stock, created_at";

/// SQLite-backed book storage
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` (e.g. `sqlite://books.db` or `sqlite::memory:`)
    /// and create the schema if missing.
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to an in-memory database is its own database, so
        // keep exactly one and never recycle it.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(DEFAULT_MAX_CONNECTIONS)
        };

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Open (creating if needed) a database file.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }
        Self::open(&format!("sqlite://{}", path.display())).await
    }

    /// Wrap an existing pool, creating the schema if missing.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Create the books table and its indexes.
async fn migrate(pool: &SqlitePool) -> Result<()> {
    info!("ensuring books schema");
    let schema = include_str!("schema.sql");
    sqlx::raw_sql(schema).execute(pool).await?;
    Ok(())
}

async fn next_id(conn: &mut SqliteConnection) -> Result<i64> {
    let id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM books")
        .fetch_one(conn)
        .await?;
    Ok(id)
}

async fn insert_row(conn: &mut SqliteConnection, book: &Book) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO books (id, title, author, pages, price, isbn, publication_year, in_stock, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(book.id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.pages)
    .bind(book.price)
    .bind(&book.isbn)
    .bind(book.publication_year)
    .bind(book.in_stock)
    .bind(book.created_at)
    .execute(conn)
    .await
    .map_err(|e| unique_violation(e, book.isbn.as_deref()))?;
    Ok(())
}

/// Set one column; returns the number of rows touched (0 when `id` is absent).
async fn apply_update(conn: &mut SqliteConnection, id: i64, update: &BookUpdate) -> Result<u64> {
    let sql = format!("UPDATE books SET {} = ? WHERE id = ?", update.field());
    let query = sqlx::query(&sql);
    let query = match update {
        BookUpdate::Title(value) | BookUpdate::Author(value) => query.bind(value.clone()),
        BookUpdate::Pages(value) => query.bind(*value),
        BookUpdate::Price(value) => query.bind(*value),
        BookUpdate::Isbn(value) => query.bind(value.clone()),
        BookUpdate::PublicationYear(value) => query.bind(*value),
        BookUpdate::InStock(value) => query.bind(*value),
    };

    let isbn = match update {
        BookUpdate::Isbn(value) => value.as_deref(),
        _ => None,
    };
    let result = query
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| unique_violation(e, isbn))?;
    Ok(result.rows_affected())
}

/// Map a violation of the isbn unique index to `Uniqueness`. Anything else,
/// a primary key collision included, stays a `Database` error.
fn unique_violation(err: sqlx::Error, isbn: Option<&str>) -> StoreError {
    if let (Some(isbn), sqlx::Error::Database(db)) = (isbn, &err) {
        // "UNIQUE constraint failed: books.isbn"
        if db.is_unique_violation() && db.message().contains("books.isbn") {
            return StoreError::uniqueness("isbn", isbn);
        }
    }
    StoreError::Database(err)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::TitleEq(title) => {
                builder.push("title = ").push_bind(title.clone());
            }
            Filter::AuthorEq(author) => {
                builder.push("author = ").push_bind(author.clone());
            }
            Filter::IsbnEq(isbn) => {
                builder.push("isbn = ").push_bind(isbn.clone());
            }
            Filter::InStock(in_stock) => {
                builder.push("in_stock = ").push_bind(*in_stock);
            }
            Filter::TitleContains(keyword) => {
                // instr() is case-sensitive, unlike LIKE
                builder
                    .push("instr(title, ")
                    .push_bind(keyword.clone())
                    .push(") > 0");
            }
            Filter::PriceBelow(ceiling) => {
                builder.push("price < ").push_bind(*ceiling);
            }
            Filter::PriceBetween { min, max } => {
                builder
                    .push("price BETWEEN ")
                    .push_bind(*min)
                    .push(" AND ")
                    .push_bind(*max);
            }
            Filter::PagesAtLeast(floor) => {
                builder.push("pages >= ").push_bind(*floor);
            }
        }
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn add(&self, book: NewBook) -> Result<Book> {
        book.validate()?;

        let mut tx = self.pool.begin().await?;
        let id = next_id(&mut *tx).await?;
        let book = Book::from_new(id, book, now());
        insert_row(&mut *tx, &book).await?;
        tx.commit().await?;

        debug!(id, "book added");
        Ok(book)
    }

    async fn add_many(&self, books: Vec<NewBook>) -> Result<usize> {
        for book in &books {
            book.validate()?;
        }

        // Dropping the transaction on error rolls back everything inserted so far
        let mut tx = self.pool.begin().await?;
        let mut id = next_id(&mut *tx).await?;
        let created_at = now();
        let count = books.len();
        for new in books {
            let book = Book::from_new(id, new, created_at);
            insert_row(&mut *tx, &book).await?;
            id += 1;
        }
        tx.commit().await?;

        debug!(added = count, "books added");
        Ok(count)
    }

    async fn get(&self, id: i64) -> Result<Book> {
        let sql = format!("SELECT {} FROM books WHERE id = ?", COLUMNS);
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn update_many(&self, id: i64, updates: Vec<BookUpdate>) -> Result<Book> {
        if updates.is_empty() {
            return Err(StoreError::invalid_argument("updates", "nothing to update"));
        }
        for update in &updates {
            update.validate()?;
        }

        // Dropping the transaction on error rolls back the updates applied so far
        let mut tx = self.pool.begin().await?;
        for update in &updates {
            if apply_update(&mut *tx, id, update).await? == 0 {
                return Err(StoreError::not_found(id));
            }
        }
        tx.commit().await?;

        debug!(id, fields = updates.len(), "book updated");
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id));
        }

        debug!(id, "book deleted");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        let sql = format!("SELECT {} FROM books ORDER BY id ASC", COLUMNS);
        let books = sqlx::query_as::<_, Book>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM books", COLUMNS));
        push_filters(&mut builder, &query.filters);

        match &query.sort {
            Some(sort) => {
                builder.push(format!(
                    " ORDER BY {} {}, id ASC",
                    sort.key.column(),
                    sort.order.sql()
                ));
            }
            None => {
                builder.push(" ORDER BY id ASC");
            }
        }

        if let Some(page) = &query.page {
            builder
                .push(" LIMIT ")
                .push_bind(i64::from(page.limit()))
                .push(" OFFSET ")
                .push_bind(page.offset() as i64);
        }

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn exists(&self, filter: &Filter) -> Result<bool> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT EXISTS (SELECT 1 FROM books");
        push_filters(&mut builder, std::slice::from_ref(filter));
        builder.push(")");

        let found: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(found != 0)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn average(&self, field: NumericField) -> Result<Option<f64>> {
        // AVG over zero rows is NULL, read as a nullable scalar
        let sql = format!("SELECT AVG({}) FROM books", field.column());
        let avg: Option<f64> = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books.db");

        let store = SqliteStore::open_path(&path).await.unwrap();
        store
            .add(NewBook::new("Harry Potter", "J.K. Rowling", 400, 79.9))
            .await
            .unwrap();
        store.close().await;

        // Reopening re-runs the schema without touching existing rows
        let store = SqliteStore::open_path(&path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn in_memory_database_keeps_rows_between_calls() {
        let store = SqliteStore::open("sqlite::memory:").await.unwrap();
        store
            .add(NewBook::new("Dune", "Frank Herbert", 412, 15.0))
            .await
            .unwrap();
        assert_eq!(store.get(1).await.unwrap().title, "Dune");
    }

    #[tokio::test]
    async fn unique_index_maps_to_uniqueness() {
        let store = SqliteStore::open("sqlite::memory:").await.unwrap();
        store
            .add(NewBook::new("Dune", "Frank Herbert", 412, 15.0).with_isbn("978-0441013593"))
            .await
            .unwrap();

        let err = store
            .add(NewBook::new("Dune Messiah", "Frank Herbert", 256, 12.0).with_isbn("978-0441013593"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Uniqueness { field: "isbn", .. }));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn primary_key_collision_stays_database_error() {
        let store = SqliteStore::open("sqlite::memory:").await.unwrap();
        store
            .add(NewBook::new("Dune", "Frank Herbert", 412, 15.0))
            .await
            .unwrap();

        let clash = Book::from_new(
            1,
            NewBook::new("Emma", "Jane Austen", 474, 9.5).with_isbn("978-0141439587"),
            now(),
        );
        let mut conn = store.pool.acquire().await.unwrap();
        let err = insert_row(&mut *conn, &clash).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)), "{err}");
    }

    #[tokio::test]
    async fn failed_multi_update_rolls_back() {
        let store = SqliteStore::open("sqlite::memory:").await.unwrap();
        store
            .add(NewBook::new("Dune", "Frank Herbert", 412, 15.0).with_isbn("A"))
            .await
            .unwrap();
        store
            .add(NewBook::new("Emma", "Jane Austen", 474, 9.5).with_isbn("B"))
            .await
            .unwrap();

        let err = store
            .update_many(2, vec![BookUpdate::Price(55.0), BookUpdate::Isbn(Some("A".into()))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Uniqueness { field: "isbn", .. }));

        let book = store.get(2).await.unwrap();
        assert_eq!(book.price, 9.5);
        assert_eq!(book.isbn.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn null_isbns_do_not_collide() {
        let store = SqliteStore::open("sqlite::memory:").await.unwrap();
        store
            .add(NewBook::new("Dune", "Frank Herbert", 412, 15.0))
            .await
            .unwrap();
        store
            .add(NewBook::new("Emma", "Jane Austen", 474, 9.5))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn batch_rolls_back_on_collision() {
        let store = SqliteStore::open("sqlite::memory:").await.unwrap();
        let batch = vec![
            NewBook::new("Dune", "Frank Herbert", 412, 15.0).with_isbn("1"),
            NewBook::new("Emma", "Jane Austen", 474, 9.5).with_isbn("1"),
        ];

        let err = store.add_many(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Uniqueness { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
