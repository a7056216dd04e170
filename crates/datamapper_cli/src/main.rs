//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run one insert/find/update/delete cycle through `BookMapper`.
//! - Keep output deterministic `key=value` lines for quick sanity checks.
//!
//! Usage: `datamapper_cli [DB_PATH]`; an in-memory database is used when no
//! path is given. Set `DATAMAPPER_LOG_DIR` (absolute) to enable file logs.

use datamapper_core::{
    core_version, default_log_level, init_logging, Book, BookMapper, BookRepository, MapperError,
    SqliteStore,
};
use log::info;
use std::process::ExitCode;
use std::sync::Arc;

const LOG_DIR_ENV: &str = "DATAMAPPER_LOG_DIR";

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("datamapper_core version={}", core_version());

    let store = match std::env::args().nth(1) {
        Some(path) => SqliteStore::open(&path),
        None => SqliteStore::open_in_memory(),
    };
    let store = match store {
        Ok(store) => store,
        Err(err) => {
            eprintln!("open failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run_smoke(&BookMapper::new(store)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("smoke failed code={} error={err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn run_smoke(books: &impl BookRepository) -> Result<(), MapperError> {
    info!("event=cli_smoke module=cli status=start");
    books.delete_all()?;

    let book = Book::new("978-X", "T", "A", 10.0);
    println!("insert isbn={}", books.insert(&book)?);

    let first = books.find(&book.isbn)?;
    let second = books.find(&book.isbn)?;
    let same_instance = match (&first, &second) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    };
    println!("find found={} same_instance={same_instance}", first.is_some());

    let duplicate = books.insert(&book).map(|_| ()).err();
    println!(
        "insert_again error={}",
        duplicate.as_ref().map_or("none", MapperError::code)
    );

    let mut edited = book.clone();
    edited.author = "B".to_string();
    books.update(&edited)?;
    let refreshed = books.find(&book.isbn)?;
    println!(
        "update author={}",
        refreshed.as_ref().map_or("-", |found| found.author.as_str())
    );

    books.delete(&edited)?;
    println!("delete found_after={}", books.find(&book.isbn)?.is_some());

    books.delete_all()?;
    println!("delete_all remaining={}", books.find_all()?.len());
    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}
