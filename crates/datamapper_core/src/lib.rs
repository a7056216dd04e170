//! Data mapper core: identity-mapped CRUD between domain objects and
//! relational rows.
//! Table specifics plug in through `MapperContract`; storage through
//! `RelationalStore`.

pub mod db;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod repo;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use mapper::{
    DataMapper, DomainObject, Identity, IdentityCache, MapperContract, MapperError, MapperResult,
    ObjectSet, Template,
};
pub use model::book::{Book, BookValidationError, Isbn};
pub use repo::book_mapper::{BookMapper, BookRepository, BookTable};
pub use store::{
    RelationalStore, RowSet, SqliteStore, Statement, StoreError, StoreResult, StoreRow,
    StoreValue,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
