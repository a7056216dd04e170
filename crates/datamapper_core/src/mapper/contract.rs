//! Per-table behavior plugged into `DataMapper`.

use super::error::MapperResult;
use super::identity::DomainObject;
use crate::store::{Statement, StoreRow};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Immutable parameterized statement text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    sql: Cow<'static, str>,
}

impl Template {
    pub const fn new(sql: &'static str) -> Self {
        Self {
            sql: Cow::Borrowed(sql),
        }
    }

    pub fn owned(sql: String) -> Self {
        Self {
            sql: Cow::Owned(sql),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

impl Display for Template {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Table-specific statements and row/object translation.
///
/// Template accessors must return the same text on every call. Binding and
/// translation callbacks must not touch the identity cache.
pub trait MapperContract {
    type Object: DomainObject;

    /// Table name used in errors and log lines.
    fn table_name(&self) -> &'static str;

    fn insert_template(&self) -> Template;
    /// Single-row lookup; the identity is bound at position 1.
    fn find_template(&self) -> Template;
    /// Criterion query used by `find_many` when the caller passes no template.
    fn find_many_template(&self) -> Option<Template> {
        None
    }
    fn update_template(&self) -> Template;
    /// Single-row delete; the identity is bound at position 1.
    fn delete_template(&self) -> Template;
    fn delete_all_template(&self) -> Template;

    /// Binds every insert parameter from `object`, in contract column order.
    fn bind_for_insert(
        &self,
        object: &Self::Object,
        statement: &mut Statement,
    ) -> MapperResult<()>;
    /// Binds every update parameter from `object`, including the key predicate.
    fn bind_for_update(
        &self,
        object: &Self::Object,
        statement: &mut Statement,
    ) -> MapperResult<()>;
    /// Builds a fresh object from one fetched row.
    fn translate_row(&self, row: &StoreRow) -> MapperResult<Self::Object>;

    /// 1-based column holding the identity in fetched rows.
    fn identity_column(&self) -> usize {
        1
    }
}
