use datamapper_core::{Book, DomainObject};
use serde_json::json;

#[test]
fn book_serializes_with_field_names() {
    let book = Book::new("978-X", "T", "A", 10.0);
    let value = serde_json::to_value(&book).unwrap();
    assert_eq!(
        value,
        json!({ "isbn": "978-X", "title": "T", "author": "A", "price": 10.0 })
    );

    let back: Book = serde_json::from_value(value).unwrap();
    assert_eq!(back, book);
}

#[test]
fn book_identity_is_its_isbn() {
    let mut book = Book::new("978-X", "T", "A", 10.0);
    assert_eq!(book.id().map(String::as_str), Some("978-X"));

    book.set_id("978-Y".to_string());
    assert_eq!(book.isbn, "978-Y");
}
