//! Generic data mapper: identity map plus template-driven CRUD.
//!
//! # Responsibility
//! - Translate between domain objects and table rows through a
//!   per-table `MapperContract`.
//! - Keep at most one live in-memory object per persisted identity.
//!
//! # Invariants
//! - Only `DataMapper` mutates its `IdentityCache`; contracts and stores never do.
//! - Store failures are translated into `MapperError` at the mapper boundary.
//! - A found-nothing lookup is `Ok(None)`; a missing row on update/delete is
//!   `MapperError::NotFound`.

pub mod cache;
pub mod contract;
pub mod data_mapper;
pub mod error;
pub mod identity;

pub use cache::IdentityCache;
pub use contract::{MapperContract, Template};
pub use data_mapper::{DataMapper, ObjectSet};
pub use error::{MapperError, MapperResult};
pub use identity::{DomainObject, Identity};
