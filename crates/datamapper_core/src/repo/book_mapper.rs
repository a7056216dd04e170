//! Book table contract and repository.
//!
//! # Responsibility
//! - Map `Book` values to the `book` table, column order
//!   `(isbn, title, author, price)`.
//! - Provide the book use-case surface on top of `DataMapper`.
//!
//! # Invariants
//! - `bind_for_insert`/`bind_for_update` call `Book::validate()` first.
//! - `translate_row` validates fetched data and reports `Integrity` on failure.

use crate::mapper::{DataMapper, MapperContract, MapperError, MapperResult, ObjectSet, Template};
use crate::model::book::{Book, Isbn};
use crate::store::{RelationalStore, Statement, StoreRow, StoreValue};
use std::sync::Arc;

const BOOK_TABLE: &str = "book";

const INSERT_SQL: Template =
    Template::new("INSERT INTO book (isbn, title, author, price) VALUES (?1, ?2, ?3, ?4);");
const FIND_SQL: Template =
    Template::new("SELECT isbn, title, author, price FROM book WHERE isbn = ?1;");
const FIND_BY_AUTHOR_SQL: Template =
    Template::new("SELECT isbn, title, author, price FROM book WHERE author = ?1;");
const FIND_ALL_SQL: Template = Template::new("SELECT isbn, title, author, price FROM book;");
const UPDATE_SQL: Template =
    Template::new("UPDATE book SET title = ?1, author = ?2, price = ?3 WHERE isbn = ?4;");
const DELETE_SQL: Template = Template::new("DELETE FROM book WHERE isbn = ?1;");
const DELETE_ALL_SQL: Template = Template::new("DELETE FROM book;");

/// `MapperContract` for the `book` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookTable;

impl MapperContract for BookTable {
    type Object = Book;

    fn table_name(&self) -> &'static str {
        BOOK_TABLE
    }

    fn insert_template(&self) -> Template {
        INSERT_SQL
    }

    fn find_template(&self) -> Template {
        FIND_SQL
    }

    /// Books whose author equals the criterion exactly.
    fn find_many_template(&self) -> Option<Template> {
        Some(FIND_BY_AUTHOR_SQL)
    }

    fn update_template(&self) -> Template {
        UPDATE_SQL
    }

    fn delete_template(&self) -> Template {
        DELETE_SQL
    }

    fn delete_all_template(&self) -> Template {
        DELETE_ALL_SQL
    }

    fn bind_for_insert(&self, book: &Book, statement: &mut Statement) -> MapperResult<()> {
        validate_for_write(book)?;
        statement.bind(1, book.isbn.as_str())?;
        statement.bind(2, book.title.as_str())?;
        statement.bind(3, book.author.as_str())?;
        statement.bind(4, book.price)?;
        Ok(())
    }

    fn bind_for_update(&self, book: &Book, statement: &mut Statement) -> MapperResult<()> {
        validate_for_write(book)?;
        statement.bind(1, book.title.as_str())?;
        statement.bind(2, book.author.as_str())?;
        statement.bind(3, book.price)?;
        statement.bind(4, book.isbn.as_str())?;
        Ok(())
    }

    fn translate_row(&self, row: &StoreRow) -> MapperResult<Book> {
        let book = Book::new(row.text(1)?, row.text(2)?, row.text(3)?, row.real(4)?);
        book.validate().map_err(|err| {
            MapperError::Integrity(format!("invalid persisted book data: {err}"))
        })?;
        Ok(book)
    }
}

fn validate_for_write(book: &Book) -> MapperResult<()> {
    book.validate().map_err(|err| MapperError::InvalidArgument(err.to_string()))
}

/// Use-case surface for book persistence.
pub trait BookRepository {
    fn insert(&self, book: &Book) -> MapperResult<Isbn>;
    fn find(&self, isbn: &str) -> MapperResult<Option<Arc<Book>>>;
    /// Exact, case-sensitive author match.
    fn find_many_by_author(&self, author: &str) -> MapperResult<ObjectSet<Book>>;
    fn find_all(&self) -> MapperResult<ObjectSet<Book>>;
    fn update(&self, book: &Book) -> MapperResult<()>;
    fn delete(&self, book: &Book) -> MapperResult<()>;
    fn delete_all(&self) -> MapperResult<()>;
}

/// Book repository backed by a `DataMapper` over any relational store.
pub struct BookMapper<S: RelationalStore> {
    mapper: DataMapper<S, BookTable>,
}

impl<S: RelationalStore> BookMapper<S> {
    pub fn new(store: S) -> Self {
        Self {
            mapper: DataMapper::new(store, BookTable),
        }
    }

    /// Underlying generic mapper, e.g. for custom criterion queries.
    pub fn mapper(&self) -> &DataMapper<S, BookTable> {
        &self.mapper
    }
}

impl<S: RelationalStore> BookRepository for BookMapper<S> {
    fn insert(&self, book: &Book) -> MapperResult<Isbn> {
        self.mapper.insert(book)
    }

    fn find(&self, isbn: &str) -> MapperResult<Option<Arc<Book>>> {
        self.mapper.find(&isbn.to_string())
    }

    fn find_many_by_author(&self, author: &str) -> MapperResult<ObjectSet<Book>> {
        self.mapper.find_many(Some(StoreValue::from(author)), None)
    }

    fn find_all(&self) -> MapperResult<ObjectSet<Book>> {
        self.mapper.find_many(None, Some(&FIND_ALL_SQL))
    }

    fn update(&self, book: &Book) -> MapperResult<()> {
        self.mapper.update(book)
    }

    fn delete(&self, book: &Book) -> MapperResult<()> {
        self.mapper.delete(book)
    }

    fn delete_all(&self) -> MapperResult<()> {
        self.mapper.delete_all()
    }
}
