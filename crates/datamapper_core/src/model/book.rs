//! Book domain model.
//!
//! # Invariants
//! - `isbn` is the natural key and must match the key pattern.
//! - `price` is finite and non-negative.

use crate::mapper::DomainObject;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static ISBN_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z][0-9A-Za-z-]*$").expect("valid isbn key regex"));

/// Natural key of a book row.
pub type Isbn = String;

/// Validation failure for a `Book` value.
#[derive(Debug, Clone, PartialEq)]
pub enum BookValidationError {
    InvalidIsbn(String),
    InvalidPrice(f64),
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIsbn(value) => write!(f, "invalid isbn key `{value}`"),
            Self::InvalidPrice(value) => {
                write!(f, "price must be finite and non-negative, got {value}")
            }
        }
    }
}

impl Error for BookValidationError {}

/// One row of the `book` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    pub author: String,
    pub price: f64,
}

impl Book {
    pub fn new(
        isbn: impl Into<Isbn>,
        title: impl Into<String>,
        author: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            price,
        }
    }

    /// Checks key shape and price range.
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if !ISBN_KEY_RE.is_match(&self.isbn) {
            return Err(BookValidationError::InvalidIsbn(self.isbn.clone()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(BookValidationError::InvalidPrice(self.price));
        }
        Ok(())
    }
}

impl DomainObject for Book {
    type Id = Isbn;

    fn id(&self) -> Option<&Isbn> {
        Some(&self.isbn)
    }

    fn set_id(&mut self, id: Isbn) {
        self.isbn = id;
    }
}
