//! Domain objects persisted through table mappers.
//!
//! # Responsibility
//! - Define the data structures mapped to rows by concrete contracts.
//!
//! # Invariants
//! - Every domain object exposes exactly one identity via `DomainObject`.

pub mod book;
