//! Concrete table mappings built on the generic `DataMapper`.
//!
//! # Responsibility
//! - Supply per-table templates and row/object translation.
//! - Expose use-case oriented repository traits over each mapper.
//!
//! # Invariants
//! - Write paths validate domain objects before binding.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod book_mapper;
