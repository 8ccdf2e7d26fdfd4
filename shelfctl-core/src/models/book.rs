//! Book record and the inputs that create or change one
//!
//! Bounds are checked when a `NewBook` or `BookUpdate` is validated, before any
//! backend touches storage. The SQLite schema mirrors the same bounds as CHECK
//! constraints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::{check_length, check_range, ValidationError};

pub const TITLE_MIN_LEN: usize = 2;
pub const TITLE_MAX_LEN: usize = 200;
pub const AUTHOR_MIN_LEN: usize = 2;
pub const AUTHOR_MAX_LEN: usize = 100;
pub const PAGES_MIN: i32 = 1;
pub const PAGES_MAX: i32 = 5000;
pub const PRICE_MIN: f64 = 0.01;
pub const PRICE_MAX: f64 = 999.99;
pub const ISBN_MAX_LEN: usize = 20;
pub const YEAR_MIN: i32 = 1000;
pub const YEAR_MAX: i32 = 2030;

fn default_in_stock() -> bool {
    true
}

/// A stored book. `id` is assigned by the store and never changes.
///
/// Field order is the CSV column order: the five legacy columns first, then the
/// optional ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub pages: i32,
    pub price: f64,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Book {
    /// Build the stored form of a validated `NewBook`.
    pub(crate) fn from_new(id: i64, new: NewBook, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            author: new.author,
            pages: new.pages,
            price: new.price,
            isbn: new.isbn,
            publication_year: new.publication_year,
            in_stock: new.in_stock,
            created_at: Some(created_at),
        }
    }

    /// Apply an already validated update in place.
    pub(crate) fn apply(&mut self, update: BookUpdate) {
        match update {
            BookUpdate::Title(title) => self.title = title,
            BookUpdate::Author(author) => self.author = author,
            BookUpdate::Pages(pages) => self.pages = pages,
            BookUpdate::Price(price) => self.price = price,
            BookUpdate::Isbn(isbn) => self.isbn = isbn,
            BookUpdate::PublicationYear(year) => self.publication_year = year,
            BookUpdate::InStock(in_stock) => self.in_stock = in_stock,
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | title: {} | author: {} | pages: {} | price: {}",
            self.id, self.title, self.author, self.pages, self.price
        )?;
        if let Some(isbn) = &self.isbn {
            write!(f, " | isbn: {}", isbn)?;
        }
        if !self.in_stock {
            write!(f, " | out of stock")?;
        }
        Ok(())
    }
}

/// Fields for a book that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub pages: i32,
    pub price: f64,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>, pages: i32, price: f64) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            pages,
            price,
            isbn: None,
            publication_year: None,
            in_stock: true,
        }
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_publication_year(mut self, year: i32) -> Self {
        self.publication_year = Some(year);
        self
    }

    pub fn out_of_stock(mut self) -> Self {
        self.in_stock = false;
        self
    }

    /// Check every field against its declared bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_author(&self.author)?;
        validate_pages(self.pages)?;
        validate_price(self.price)?;
        if let Some(isbn) = &self.isbn {
            validate_isbn(isbn)?;
        }
        if let Some(year) = self.publication_year {
            validate_year(year)?;
        }
        Ok(())
    }
}

/// A single-field change to an existing book.
#[derive(Debug, Clone, PartialEq)]
pub enum BookUpdate {
    Title(String),
    Author(String),
    Pages(i32),
    Price(f64),
    /// `None` clears the isbn
    Isbn(Option<String>),
    /// `None` clears the year
    PublicationYear(Option<i32>),
    InStock(bool),
}

impl BookUpdate {
    /// Column / field name this update targets.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::Author(_) => "author",
            Self::Pages(_) => "pages",
            Self::Price(_) => "price",
            Self::Isbn(_) => "isbn",
            Self::PublicationYear(_) => "publication_year",
            Self::InStock(_) => "in_stock",
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Title(title) => validate_title(title),
            Self::Author(author) => validate_author(author),
            Self::Pages(pages) => validate_pages(*pages),
            Self::Price(price) => validate_price(*price),
            Self::Isbn(Some(isbn)) => validate_isbn(isbn),
            Self::PublicationYear(Some(year)) => validate_year(*year),
            Self::Isbn(None) | Self::PublicationYear(None) | Self::InStock(_) => Ok(()),
        }
    }
}

/// Numeric fields that can be averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericField {
    Price,
    Pages,
}

impl NumericField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Pages => "pages",
        }
    }

    pub(crate) fn value_of(&self, book: &Book) -> f64 {
        match self {
            Self::Price => book.price,
            Self::Pages => f64::from(book.pages),
        }
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    check_length("title", title, TITLE_MIN_LEN, TITLE_MAX_LEN)
}

fn validate_author(author: &str) -> Result<(), ValidationError> {
    check_length("author", author, AUTHOR_MIN_LEN, AUTHOR_MAX_LEN)
}

fn validate_pages(pages: i32) -> Result<(), ValidationError> {
    check_range("pages", pages, PAGES_MIN, PAGES_MAX)
}

fn validate_price(price: f64) -> Result<(), ValidationError> {
    check_range("price", price, PRICE_MIN, PRICE_MAX)
}

fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    check_length("isbn", isbn, 1, ISBN_MAX_LEN)
}

fn validate_year(year: i32) -> Result<(), ValidationError> {
    check_range("publication_year", year, YEAR_MIN, YEAR_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_book() {
        let book = NewBook::new("Harry Potter", "J.K. Rowling", 400, 79.9)
            .with_isbn("978-0747532699")
            .with_publication_year(1997);
        assert!(book.validate().is_ok());
        assert!(book.in_stock);
    }

    #[test]
    fn rejects_short_title() {
        let err = NewBook::new("H", "J.K. Rowling", 400, 79.9)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooShort { field: "title", min: 2 }));
    }

    #[test]
    fn rejects_long_author() {
        let author = "a".repeat(101);
        let err = NewBook::new("Dune", author, 400, 20.0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "author", max: 100 }));
    }

    #[test]
    fn page_bounds() {
        assert!(NewBook::new("Dune", "Herbert", 1, 20.0).validate().is_ok());
        assert!(NewBook::new("Dune", "Herbert", 5000, 20.0).validate().is_ok());

        let err = NewBook::new("Dune", "Herbert", 0, 20.0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "pages", .. }));

        let err = NewBook::new("Dune", "Herbert", 5001, 20.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "pages", .. }));
    }

    #[test]
    fn price_bounds() {
        let err = NewBook::new("Dune", "Herbert", 400, 0.0).validate().unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "price", .. }));

        let err = NewBook::new("Dune", "Herbert", 400, 1000.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "price", .. }));
    }

    #[test]
    fn optional_field_bounds() {
        let err = NewBook::new("Dune", "Herbert", 400, 20.0)
            .with_isbn("x".repeat(21))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "isbn", max: 20 }));

        let err = NewBook::new("Dune", "Herbert", 400, 20.0)
            .with_publication_year(999)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "publication_year", .. }
        ));
    }

    #[test]
    fn update_validation() {
        assert!(BookUpdate::Price(99.9).validate().is_ok());
        assert!(BookUpdate::Price(-1.0).validate().is_err());
        assert!(BookUpdate::Isbn(None).validate().is_ok());
        assert!(BookUpdate::Title(String::new()).validate().is_err());
        assert_eq!(BookUpdate::InStock(false).field(), "in_stock");
    }

    #[test]
    fn apply_update() {
        let mut book = Book::from_new(1, NewBook::new("Dune", "Herbert", 400, 20.0), Utc::now());
        book.apply(BookUpdate::Price(25.5));
        book.apply(BookUpdate::InStock(false));
        assert_eq!(book.price, 25.5);
        assert!(!book.in_stock);
        assert_eq!(book.id, 1);
    }

    #[test]
    fn display_line() {
        let book = Book::from_new(1, NewBook::new("Harry Potter", "J.K. Rowling", 400, 79.9), Utc::now());
        assert_eq!(
            book.to_string(),
            "ID: 1 | title: Harry Potter | author: J.K. Rowling | pages: 400 | price: 79.9"
        );
    }
}
