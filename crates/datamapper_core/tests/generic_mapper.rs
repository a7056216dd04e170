use datamapper_core::{
    DataMapper, DomainObject, MapperContract, MapperError, MapperResult, RelationalStore,
    SqliteStore, Statement, StoreRow, StoreValue, Template,
};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct Shelf {
    id: Option<Uuid>,
    label: String,
    capacity: i64,
}

impl Shelf {
    fn new(label: &str, capacity: i64) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            label: label.to_string(),
            capacity,
        }
    }
}

impl DomainObject for Shelf {
    type Id = Uuid;

    fn id(&self) -> Option<&Uuid> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }
}

#[derive(Default)]
struct ShelfTable {
    duplicate_find: bool,
}

impl MapperContract for ShelfTable {
    type Object = Shelf;

    fn table_name(&self) -> &'static str {
        "shelf"
    }

    fn insert_template(&self) -> Template {
        Template::new("INSERT INTO shelf (id, label, capacity) VALUES (?1, ?2, ?3)")
    }

    fn find_template(&self) -> Template {
        if self.duplicate_find {
            Template::new(
                "SELECT id, label, capacity FROM shelf WHERE id = ?1
                 UNION ALL
                 SELECT id, label, capacity FROM shelf WHERE id = ?1",
            )
        } else {
            Template::new("SELECT id, label, capacity FROM shelf WHERE id = ?1")
        }
    }

    fn update_template(&self) -> Template {
        Template::new("UPDATE shelf SET label = ?1, capacity = ?2 WHERE id = ?3")
    }

    fn delete_template(&self) -> Template {
        Template::new("DELETE FROM shelf WHERE id = ?1")
    }

    fn delete_all_template(&self) -> Template {
        Template::new("DELETE FROM shelf")
    }

    fn bind_for_insert(&self, shelf: &Shelf, statement: &mut Statement) -> MapperResult<()> {
        statement.bind(1, shelf.id)?;
        statement.bind(2, shelf.label.as_str())?;
        statement.bind(3, shelf.capacity)?;
        Ok(())
    }

    fn bind_for_update(&self, shelf: &Shelf, statement: &mut Statement) -> MapperResult<()> {
        statement.bind(1, shelf.label.as_str())?;
        statement.bind(2, shelf.capacity)?;
        statement.bind(3, shelf.id)?;
        Ok(())
    }

    fn translate_row(&self, row: &StoreRow) -> MapperResult<Shelf> {
        let id = Uuid::parse_str(row.text(1)?)
            .map_err(|err| MapperError::Integrity(format!("bad shelf id: {err}")))?;
        Ok(Shelf {
            id: Some(id),
            label: row.text(2)?.to_string(),
            capacity: row.integer(3)?,
        })
    }
}

fn shelf_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.with_connection(|conn| {
        conn.execute_batch(
            "CREATE TABLE shelf (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                capacity INTEGER NOT NULL
            );",
        )
        .unwrap();
    });
    store
}

fn shelves() -> DataMapper<SqliteStore, ShelfTable> {
    DataMapper::new(shelf_store(), ShelfTable::default())
}

#[test]
fn insert_rejects_absent_and_nil_identity() {
    let mapper = shelves();

    let mut shelf = Shelf::new("fiction", 40);
    shelf.id = None;
    assert!(matches!(
        mapper.insert(&shelf),
        Err(MapperError::InvalidArgument(_))
    ));

    shelf.set_id(Uuid::nil());
    assert!(matches!(
        mapper.insert(&shelf),
        Err(MapperError::InvalidArgument(_))
    ));
}

#[test]
fn update_and_delete_reject_absent_identity() {
    let mapper = shelves();
    let mut shelf = Shelf::new("fiction", 40);
    shelf.id = None;

    assert!(matches!(
        mapper.update(&shelf),
        Err(MapperError::InvalidArgument(_))
    ));
    assert!(matches!(
        mapper.delete(&shelf),
        Err(MapperError::InvalidArgument(_))
    ));
}

#[test]
fn uuid_identity_round_trips_through_cache() {
    let mapper = shelves();
    let shelf = Shelf::new("poetry", 12);
    let id = mapper.insert(&shelf).unwrap();

    let first = mapper.find(&id).unwrap().unwrap();
    let second = mapper.find(&id).unwrap().unwrap();
    assert_eq!(*first, shelf);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn multiple_rows_for_one_identity_is_integrity_error() {
    let store = shelf_store();
    let shelf = Shelf::new("history", 8);
    DataMapper::new(&store, ShelfTable::default())
        .insert(&shelf)
        .unwrap();

    let mapper = DataMapper::new(
        &store,
        ShelfTable {
            duplicate_find: true,
        },
    );
    let err = mapper.find(&shelf.id.unwrap()).unwrap_err();
    assert!(matches!(err, MapperError::Integrity(_)));
}

#[test]
fn find_many_criterion_without_any_template_is_invalid_argument() {
    let mapper = shelves();
    let err = mapper
        .find_many(Some(StoreValue::from("poetry")), None)
        .unwrap_err();
    assert!(matches!(err, MapperError::InvalidArgument(_)));
}

#[test]
fn find_many_criterion_on_parameterless_template_is_store_error() {
    let mapper = shelves();
    let all = Template::new("SELECT id, label, capacity FROM shelf");
    let err = mapper
        .find_many(Some(StoreValue::Integer(1)), Some(&all))
        .unwrap_err();
    assert!(matches!(err, MapperError::Store(_)));
}

#[test]
fn row_without_identity_is_integrity_error() {
    let mapper = shelves();
    mapper.insert(&Shelf::new("atlases", 3)).unwrap();

    let anonymous = Template::new("SELECT NULL, label, capacity FROM shelf");
    let err = mapper.find_many(None, Some(&anonymous)).unwrap_err();
    assert!(matches!(err, MapperError::Integrity(_)));
    assert_eq!(mapper.cached_len(), 0);
}

#[test]
fn row_missing_columns_is_integrity_error() {
    let mapper = shelves();
    mapper.insert(&Shelf::new("atlases", 3)).unwrap();

    let narrow = Template::new("SELECT id, label FROM shelf");
    let err = mapper.find_many(None, Some(&narrow)).unwrap_err();
    assert!(matches!(err, MapperError::Integrity(_)));
}

#[test]
fn load_resolves_externally_fetched_rows_through_cache() {
    let mapper = shelves();
    let shelf = Shelf::new("maps", 5);
    let id = mapper.insert(&shelf).unwrap();
    let cached = mapper.find(&id).unwrap().unwrap();

    let mut statement = mapper
        .store()
        .prepare("SELECT id, 'stale label', 0 FROM shelf WHERE id = ?1")
        .unwrap();
    statement.bind(1, id).unwrap();
    let rows = mapper.store().execute_query(&statement).unwrap();

    let loaded = mapper.load_all(rows).unwrap();
    let object = loaded.get(&id).unwrap();
    assert!(Arc::ptr_eq(object, &cached));
    assert_eq!(object.label, "maps");
}

#[test]
fn concurrent_finds_share_one_instance() {
    let mapper = shelves();
    let id = mapper.insert(&Shelf::new("reference", 20)).unwrap();

    let shared = &mapper;
    let found: Vec<Arc<Shelf>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || shared.find(&id).unwrap().unwrap()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(mapper.cached_len(), 1);
    assert!(found.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn concurrent_updates_leave_cache_consistent_with_store() {
    let mapper = shelves();
    let shelf = Shelf::new("reference", 0);
    let id = mapper.insert(&shelf).unwrap();

    thread::scope(|scope| {
        for capacity in 1..=6 {
            let mapper = &mapper;
            let mut edited = shelf.clone();
            edited.capacity = capacity;
            scope.spawn(move || {
                mapper.update(&edited).unwrap();
                mapper.find(&id).unwrap().unwrap();
            });
        }
    });

    let cached = mapper.find(&id).unwrap().unwrap();
    let stored: i64 = mapper.store().with_connection(|conn| {
        conn.query_row(
            "SELECT capacity FROM shelf WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .unwrap()
    });
    assert_eq!(cached.capacity, stored);
}
