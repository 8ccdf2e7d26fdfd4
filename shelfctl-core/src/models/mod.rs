//! Domain models with validation at construction
//!
//! All user input is validated before it reaches a backend.
//! Invalid input returns ValidationError, not panic.

pub mod book;
pub mod pagination;
pub mod validation;

pub use book::{Book, BookUpdate, NewBook, NumericField};
pub use pagination::{Pagination, DEFAULT_PER_PAGE};
pub use validation::ValidationError;
