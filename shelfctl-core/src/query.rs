//! Query model shared by every backend
//!
//! A `BookQuery` is plain data: filters (AND-ed), an optional sort and an
//! optional page. File and memory backends run it with [`BookQuery::apply`];
//! the SQLite backend translates the same value to SQL. Both paths must agree,
//! so string comparison is byte-wise (SQLite's BINARY collation), substring
//! matching is case-sensitive, and sort ties fall back to ascending id.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{Book, Pagination};

/// A single predicate over a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    TitleEq(String),
    AuthorEq(String),
    IsbnEq(String),
    InStock(bool),
    /// Case-sensitive substring of the title
    TitleContains(String),
    /// `price < ceiling`
    PriceBelow(f64),
    /// `min <= price <= max`
    PriceBetween { min: f64, max: f64 },
    /// `pages >= floor`
    PagesAtLeast(i32),
}

impl Filter {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            Self::TitleEq(title) => book.title == *title,
            Self::AuthorEq(author) => book.author == *author,
            Self::IsbnEq(isbn) => book.isbn.as_deref() == Some(isbn.as_str()),
            Self::InStock(in_stock) => book.in_stock == *in_stock,
            Self::TitleContains(keyword) => book.title.contains(keyword.as_str()),
            Self::PriceBelow(ceiling) => book.price < *ceiling,
            Self::PriceBetween { min, max } => book.price >= *min && book.price <= *max,
            Self::PagesAtLeast(floor) => book.pages >= *floor,
        }
    }
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Id,
    Title,
    Author,
    Pages,
    Price,
}

impl SortKey {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Author => "author",
            Self::Pages => "pages",
            Self::Price => "price",
        }
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Title => a.title.cmp(&b.title),
            Self::Author => a.author.cmp(&b.author),
            Self::Pages => a.pages.cmp(&b.pages),
            Self::Price => a.price.total_cmp(&b.price),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(key: SortKey) -> Self {
        Self {
            key,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(key: SortKey) -> Self {
        Self {
            key,
            order: SortOrder::Desc,
        }
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        let primary = match self.order {
            SortOrder::Asc => self.key.compare(a, b),
            SortOrder::Desc => self.key.compare(b, a),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Filters + sort + page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub page: Option<Pagination>,
}

impl BookQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn sort_by(self, key: SortKey, order: SortOrder) -> Self {
        self.sort(Sort { key, order })
    }

    pub fn paginate(mut self, page: Pagination) -> Self {
        self.page = Some(page);
        self
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.filters.iter().all(|f| f.matches(book))
    }

    /// Run the query over books given in storage order.
    ///
    /// Without a sort the storage order is kept.
    pub fn apply(&self, books: impl IntoIterator<Item = Book>) -> Vec<Book> {
        let mut matched: Vec<Book> = books.into_iter().filter(|b| self.matches(b)).collect();

        if let Some(sort) = &self.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }

        match &self.page {
            Some(page) => matched
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.limit() as usize)
                .collect(),
            None => matched,
        }
    }
}
