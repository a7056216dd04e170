//! Template-method CRUD core with identity-map semantics.
//!
//! # Responsibility
//! - Validate inputs, run contract templates against the store, and
//!   resolve fetched rows through the identity cache.
//!
//! # Invariants
//! - The cache lock is held for the whole of every operation, store round
//!   trip included, so a concurrent update can never slip between a cache
//!   miss and the following `put`.
//! - `insert` never populates the cache; only `load` does.
//! - `update`/`delete` evict before executing; a later `find` re-translates.

use super::cache::IdentityCache;
use super::contract::{MapperContract, Template};
use super::error::{MapperError, MapperResult};
use super::identity::{DomainObject, Identity};
use crate::store::{RelationalStore, RowSet, Statement, StoreError, StoreRow, StoreValue};
use log::{debug, warn};
use std::collections::hash_map::{self, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

type ObjectId<C> = <<C as MapperContract>::Object as DomainObject>::Id;
type Cache<C> = IdentityCache<ObjectId<C>, <C as MapperContract>::Object>;

/// Objects returned by a multi-row lookup, unique by identity, unordered.
#[derive(Debug)]
pub struct ObjectSet<T: DomainObject> {
    objects: HashMap<T::Id, Arc<T>>,
}

impl<T: DomainObject> ObjectSet<T> {
    fn new() -> Self {
        Self {
            objects: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: &T::Id) -> Option<&Arc<T>> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.objects.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &T::Id> {
        self.objects.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.objects.values()
    }
}

impl<T: DomainObject> IntoIterator for ObjectSet<T> {
    type Item = Arc<T>;
    type IntoIter = hash_map::IntoValues<T::Id, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_values()
    }
}

/// Generic mapper for one table, parameterized by store and contract.
///
/// Constructed explicitly and passed around by the caller; it shares its
/// store but owns its identity cache exclusively.
pub struct DataMapper<S, C: MapperContract> {
    store: S,
    contract: C,
    cache: Mutex<Cache<C>>,
}

impl<S, C> DataMapper<S, C>
where
    S: RelationalStore,
    C: MapperContract,
{
    pub fn new(store: S, contract: C) -> Self {
        Self {
            store,
            contract,
            cache: Mutex::new(IdentityCache::new()),
        }
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of identities currently held in the cache.
    pub fn cached_len(&self) -> usize {
        self.cache().len()
    }

    pub fn is_cached(&self, id: &ObjectId<C>) -> bool {
        self.cache().contains(id)
    }

    /// Inserts `object` and returns its identity.
    ///
    /// # Errors
    /// - `InvalidArgument` when the identity is absent or blank, or the
    ///   contract cannot bind the object.
    /// - `Conflict` when the identity already exists in the table.
    pub fn insert(&self, object: &C::Object) -> MapperResult<ObjectId<C>> {
        let started_at = Instant::now();
        let result = self.insert_inner(object);
        self.log_outcome("insert", started_at, &result);
        result
    }

    /// Looks up one object by identity.
    ///
    /// Returns `Ok(None)` when no row matches; a cached object is returned
    /// as the same `Arc` on every call until it is evicted.
    ///
    /// # Errors
    /// - `InvalidArgument` when `id` is blank.
    /// - `Integrity` when the lookup yields more than one row.
    pub fn find(&self, id: &ObjectId<C>) -> MapperResult<Option<Arc<C::Object>>> {
        let started_at = Instant::now();
        let result = self.find_inner(id);
        self.log_outcome("find", started_at, &result);
        result
    }

    /// Runs a criterion query and resolves every row through the cache.
    ///
    /// `template` defaults to the contract's `find_many_template`. The
    /// criterion, when present, is bound at position 1.
    ///
    /// # Errors
    /// - `InvalidArgument` when both arguments are absent, or no template
    ///   can be resolved.
    pub fn find_many(
        &self,
        criterion: Option<StoreValue>,
        template: Option<&Template>,
    ) -> MapperResult<ObjectSet<C::Object>> {
        let started_at = Instant::now();
        let result = self.find_many_inner(criterion, template);
        self.log_outcome("find_many", started_at, &result);
        result
    }

    /// Writes `object` over its existing row.
    ///
    /// # Errors
    /// - `InvalidArgument` when the identity is absent or blank.
    /// - `NotFound` when no row was affected.
    pub fn update(&self, object: &C::Object) -> MapperResult<()> {
        let started_at = Instant::now();
        let result = self.update_inner(object);
        self.log_outcome("update", started_at, &result);
        result
    }

    /// Deletes the row for `object`'s identity.
    ///
    /// # Errors
    /// - `InvalidArgument` when the identity is absent or blank.
    /// - `NotFound` when no row was affected.
    pub fn delete(&self, object: &C::Object) -> MapperResult<()> {
        let started_at = Instant::now();
        let result = self.delete_inner(object);
        self.log_outcome("delete", started_at, &result);
        result
    }

    /// Empties the cache, then the table. An already empty table is fine.
    pub fn delete_all(&self) -> MapperResult<()> {
        let started_at = Instant::now();
        let result = self.delete_all_inner();
        self.log_outcome("delete_all", started_at, &result);
        result
    }

    /// Resolves one fetched row to its canonical object.
    pub fn load(&self, row: &StoreRow) -> MapperResult<Arc<C::Object>> {
        let mut cache = self.cache();
        self.load_row(&mut cache, row)
    }

    /// Resolves every row of `rows` to its canonical object.
    pub fn load_all(&self, rows: RowSet) -> MapperResult<ObjectSet<C::Object>> {
        let mut cache = self.cache();
        self.load_rows(&mut cache, rows)
    }

    fn insert_inner(&self, object: &C::Object) -> MapperResult<ObjectId<C>> {
        let id = require_identity(object, "insert")?.clone();

        let mut statement = self.prepare(&self.contract.insert_template())?;
        self.contract.bind_for_insert(object, &mut statement)?;
        self
            .store
            .execute(&statement)
            .map_err(|err| self.store_error(err))?;

        Ok(id)
    }

    fn find_inner(&self, id: &ObjectId<C>) -> MapperResult<Option<Arc<C::Object>>> {
        if id.is_blank() {
            return Err(MapperError::InvalidArgument(
                "find failed because the identity is blank".to_string(),
            ));
        }

        let mut cache = self.cache();
        let mut statement = self.prepare(&self.contract.find_template())?;
        statement.bind(1, id.to_store_value())?;

        let mut rows = self
            .store
            .execute_query(&statement)
            .map_err(|err| self.store_error(err))?;
        if rows.len() > 1 {
            return Err(MapperError::Integrity(format!(
                "{} lookup by identity `{id}` returned {} rows",
                self.contract.table_name(),
                rows.len()
            )));
        }

        match rows.next() {
            Some(row) => self.load_row(&mut cache, &row).map(Some),
            None => Ok(None),
        }
    }

    fn find_many_inner(
        &self,
        criterion: Option<StoreValue>,
        template: Option<&Template>,
    ) -> MapperResult<ObjectSet<C::Object>> {
        if criterion.is_none() && template.is_none() {
            return Err(MapperError::InvalidArgument(
                "find_many failed because both criterion and template are absent".to_string(),
            ));
        }

        let template = match template {
            Some(template) => template.clone(),
            None => self.contract.find_many_template().ok_or_else(|| {
                MapperError::InvalidArgument(format!(
                    "find_many failed because {} defines no default criterion template",
                    self.contract.table_name()
                ))
            })?,
        };

        let mut cache = self.cache();
        let mut statement = self.prepare(&template)?;
        if let Some(criterion) = criterion {
            statement.bind(1, criterion)?;
        }

        let rows = self
            .store
            .execute_query(&statement)
            .map_err(|err| self.store_error(err))?;
        self.load_rows(&mut cache, rows)
    }

    fn update_inner(&self, object: &C::Object) -> MapperResult<()> {
        let id = require_identity(object, "update")?;

        let mut cache = self.cache();
        cache.remove(id);

        let mut statement = self.prepare(&self.contract.update_template())?;
        self.contract.bind_for_update(object, &mut statement)?;
        let changed = self
            .store
            .execute(&statement)
            .map_err(|err| self.store_error(err))?;
        if changed == 0 {
            return Err(self.not_found(id));
        }

        Ok(())
    }

    fn delete_inner(&self, object: &C::Object) -> MapperResult<()> {
        let id = require_identity(object, "delete")?;

        let mut cache = self.cache();
        cache.remove(id);

        let mut statement = self.prepare(&self.contract.delete_template())?;
        statement.bind(1, id.to_store_value())?;
        let changed = self
            .store
            .execute(&statement)
            .map_err(|err| self.store_error(err))?;
        if changed == 0 {
            return Err(self.not_found(id));
        }

        Ok(())
    }

    fn delete_all_inner(&self) -> MapperResult<()> {
        let mut cache = self.cache();
        cache.clear();

        let statement = self.prepare(&self.contract.delete_all_template())?;
        let removed = self
            .store
            .execute(&statement)
            .map_err(|err| self.store_error(err))?;
        debug!(
            "event=mapper_delete_all module=mapper table={} removed={}",
            self.contract.table_name(),
            removed
        );

        Ok(())
    }

    fn load_rows(&self, cache: &mut Cache<C>, rows: RowSet) -> MapperResult<ObjectSet<C::Object>> {
        let mut objects = ObjectSet::new();
        for row in rows {
            let object = self.load_row(cache, &row)?;
            if let Some(id) = object.id() {
                objects.objects.insert(id.clone(), object);
            }
        }
        Ok(objects)
    }

    fn load_row(&self, cache: &mut Cache<C>, row: &StoreRow) -> MapperResult<Arc<C::Object>> {
        let column = self.contract.identity_column();
        let raw = row.value(column)?;
        let id = <ObjectId<C> as Identity>::from_store_value(raw)
            .filter(|id| !id.is_blank())
            .ok_or_else(|| {
                MapperError::Integrity(format!(
                    "{} row holds no usable identity in column {column} (found {})",
                    self.contract.table_name(),
                    raw.type_name()
                ))
            })?;

        if let Some(cached) = cache.get(&id) {
            return Ok(cached);
        }

        let object = self.contract.translate_row(row)?;
        if object.id() != Some(&id) {
            return Err(MapperError::Integrity(format!(
                "{} row translated to a different identity than `{id}`",
                self.contract.table_name()
            )));
        }

        let object = Arc::new(object);
        cache.put(id, Arc::clone(&object));
        Ok(object)
    }

    fn prepare(&self, template: &Template) -> MapperResult<Statement> {
        self.store
            .prepare(template.as_str())
            .map_err(|err| self.store_error(err))
    }

    fn store_error(&self, err: StoreError) -> MapperError {
        MapperError::from_store(self.contract.table_name(), err)
    }

    fn not_found(&self, id: &ObjectId<C>) -> MapperError {
        MapperError::NotFound {
            table: self.contract.table_name(),
            identity: id.to_string(),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Cache<C>> {
        // Cache mutations are single map calls, so a poisoned guard still
        // holds a consistent map.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_outcome<R>(&self, operation: &str, started_at: Instant, result: &MapperResult<R>) {
        match result {
            Ok(_) => debug!(
                "event=mapper_{} module=mapper status=ok table={} duration_ms={}",
                operation,
                self.contract.table_name(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=mapper_{} module=mapper status=error table={} duration_ms={} error_code={} error={}",
                operation,
                self.contract.table_name(),
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
    }
}

fn require_identity<'a, T: DomainObject>(
    object: &'a T,
    operation: &str,
) -> MapperResult<&'a T::Id> {
    match object.id() {
        Some(id) if !id.is_blank() => Ok(id),
        _ => Err(MapperError::InvalidArgument(format!(
            "{operation} failed because the object identity is absent"
        ))),
    }
}
