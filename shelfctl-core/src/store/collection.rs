//! In-memory book collection shared by the memory and CSV backends
//!
//! Holds books in storage order and enforces the store invariants: ids are
//! `max + 1`, never reused while the max record exists, and isbns never collide.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::error::{Result, StoreError};
use crate::models::{Book, BookUpdate, NewBook, NumericField};
use crate::query::{BookQuery, Filter};

#[derive(Debug, Clone, Default)]
pub(crate) struct BookCollection {
    books: Vec<Book>,
}

impl BookCollection {
    pub fn new(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn next_id(&self) -> i64 {
        self.books.iter().map(|b| b.id).max().unwrap_or(0) + 1
    }

    fn position(&self, id: i64) -> Result<usize> {
        self.books
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| StoreError::not_found(id))
    }

    /// True if another book (not `except_id`) already holds this isbn.
    fn isbn_taken(&self, isbn: &str, except_id: Option<i64>) -> bool {
        self.books
            .iter()
            .any(|b| Some(b.id) != except_id && b.isbn.as_deref() == Some(isbn))
    }

    pub fn insert(&mut self, new: NewBook, created_at: DateTime<Utc>) -> Result<Book> {
        new.validate()?;
        if let Some(isbn) = &new.isbn {
            if self.isbn_taken(isbn, None) {
                return Err(StoreError::uniqueness("isbn", isbn.as_str()));
            }
        }

        let book = Book::from_new(self.next_id(), new, created_at);
        self.books.push(book.clone());
        Ok(book)
    }

    /// Validate the whole batch before touching the collection.
    pub fn insert_all(&mut self, batch: Vec<NewBook>, created_at: DateTime<Utc>) -> Result<usize> {
        let mut seen: HashSet<&str> = HashSet::new();
        for new in &batch {
            new.validate()?;
            if let Some(isbn) = new.isbn.as_deref() {
                if self.isbn_taken(isbn, None) || !seen.insert(isbn) {
                    return Err(StoreError::uniqueness("isbn", isbn));
                }
            }
        }

        let count = batch.len();
        let mut next_id = self.next_id();
        for new in batch {
            self.books.push(Book::from_new(next_id, new, created_at));
            next_id += 1;
        }
        Ok(count)
    }

    pub fn get(&self, id: i64) -> Result<&Book> {
        let pos = self.position(id)?;
        Ok(&self.books[pos])
    }

    /// Apply several updates to one book. Bounds and isbn collisions are
    /// checked for every update before the first one is applied.
    pub fn update_all(&mut self, id: i64, updates: Vec<BookUpdate>) -> Result<Book> {
        if updates.is_empty() {
            return Err(StoreError::invalid_argument("updates", "nothing to update"));
        }
        for update in &updates {
            update.validate()?;
        }
        let pos = self.position(id)?;
        for update in &updates {
            if let BookUpdate::Isbn(Some(isbn)) = update {
                if self.isbn_taken(isbn, Some(id)) {
                    return Err(StoreError::uniqueness("isbn", isbn.as_str()));
                }
            }
        }

        let book = &mut self.books[pos];
        for update in updates {
            book.apply(update);
        }
        Ok(book.clone())
    }

    pub fn remove(&mut self, id: i64) -> Result<Book> {
        let pos = self.position(id)?;
        Ok(self.books.remove(pos))
    }

    pub fn find(&self, query: &BookQuery) -> Vec<Book> {
        query.apply(self.books.iter().cloned())
    }

    pub fn exists(&self, filter: &Filter) -> bool {
        self.books.iter().any(|b| filter.matches(b))
    }

    pub fn average(&self, field: NumericField) -> Option<f64> {
        if self.books.is_empty() {
            return None;
        }
        let total: f64 = self.books.iter().map(|b| field.value_of(b)).sum();
        Some(total / self.books.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn harry() -> NewBook {
        NewBook::new("Harry Potter", "J.K. Rowling", 400, 79.9)
    }

    #[test]
    fn ids_follow_max() {
        let mut c = BookCollection::default();
        assert_eq!(c.insert(harry(), Utc::now()).unwrap().id, 1);
        assert_eq!(c.insert(harry(), Utc::now()).unwrap().id, 2);
        assert_eq!(c.insert(harry(), Utc::now()).unwrap().id, 3);

        // Removing a middle id does not lower the max
        c.remove(2).unwrap();
        assert_eq!(c.next_id(), 4);

        // Removing the max does
        c.remove(3).unwrap();
        assert_eq!(c.next_id(), 2);
    }

    #[test]
    fn isbn_collision_rejected() {
        let mut c = BookCollection::default();
        c.insert(harry().with_isbn("111"), Utc::now()).unwrap();
        let err = c.insert(harry().with_isbn("111"), Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::Uniqueness { field: "isbn", .. }));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn isbn_update_to_own_value_allowed() {
        let mut c = BookCollection::default();
        c.insert(harry().with_isbn("111"), Utc::now()).unwrap();
        c.insert(harry().with_isbn("222"), Utc::now()).unwrap();

        assert!(c.update_all(1, vec![BookUpdate::Isbn(Some("111".into()))]).is_ok());
        let err = c
            .update_all(1, vec![BookUpdate::Isbn(Some("222".into()))])
            .unwrap_err();
        assert!(matches!(err, StoreError::Uniqueness { .. }));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut c = BookCollection::default();
        let batch = vec![
            harry(),
            NewBook::new("1984", "George Orwell", 350, 59.9),
            NewBook::new("X", "bad title", 350, 59.9),
        ];
        assert!(c.insert_all(batch, Utc::now()).is_err());
        assert_eq!(c.len(), 0);

        let dup = vec![harry().with_isbn("9"), harry().with_isbn("9")];
        assert!(matches!(
            c.insert_all(dup, Utc::now()).unwrap_err(),
            StoreError::Uniqueness { .. }
        ));
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn failed_multi_update_changes_nothing() {
        let mut c = BookCollection::default();
        c.insert(harry().with_isbn("111"), Utc::now()).unwrap();
        c.insert(harry().with_isbn("222"), Utc::now()).unwrap();

        let err = c
            .update_all(
                2,
                vec![BookUpdate::Price(55.0), BookUpdate::Isbn(Some("111".into()))],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Uniqueness { .. }));

        let book = c.get(2).unwrap();
        assert_eq!(book.price, 79.9);
        assert_eq!(book.isbn.as_deref(), Some("222"));

        let book = c
            .update_all(2, vec![BookUpdate::Price(55.0), BookUpdate::Pages(500)])
            .unwrap();
        assert_eq!((book.price, book.pages), (55.0, 500));

        assert!(matches!(
            c.update_all(2, vec![]).unwrap_err(),
            StoreError::InvalidArgument { name: "updates", .. }
        ));
    }

    #[test]
    fn missing_id_is_not_found() {
        let mut c = BookCollection::default();
        assert!(c.get(1).unwrap_err().is_not_found());
        assert!(c.remove(1).unwrap_err().is_not_found());
        assert!(c
            .update_all(1, vec![BookUpdate::Price(10.0)])
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn average_of_empty_is_none() {
        let mut c = BookCollection::default();
        assert_eq!(c.average(NumericField::Price), None);

        c.insert(NewBook::new("Dune", "Herbert", 400, 10.0), Utc::now()).unwrap();
        c.insert(NewBook::new("Emma", "Austen", 200, 20.0), Utc::now()).unwrap();
        assert_eq!(c.average(NumericField::Price), Some(15.0));
        assert_eq!(c.average(NumericField::Pages), Some(300.0));
    }
}
