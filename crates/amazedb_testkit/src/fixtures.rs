//! Test fixtures and database helpers.

use amazedb_core::{Config, Database, Document, Table};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

/// A database in a temporary storage root, deleted on drop.
pub struct TestStore {
    /// The database instance.
    pub db: Database,
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates database `test` with fsync disabled.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Creates database `test` with `config`.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::create(temp_dir.path(), "test", config)
            .expect("Failed to create test database");
        Self { db, temp_dir }
    }

    /// Storage root the database lives under.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Creates `name` and fills it with `documents`.
    pub fn seeded(&self, name: &str, documents: Vec<Document>) -> Table {
        let table = self.db.create_table(name).expect("Failed to create table");
        table
            .insert_many(documents)
            .expect("Failed to insert documents");
        table
    }

    /// Re-opens the database from disk with the same configuration.
    pub fn reopen(&self) -> Database {
        Database::open(self.root(), "test", self.db.config().clone())
            .expect("Failed to reopen database")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Configuration for tests: defaults with fsync off.
pub fn test_config() -> Config {
    Config::default().sync_on_write(false)
}

/// Runs `f` with a temporary database.
///
/// # Example
///
/// ```rust,ignore
/// use amazedb_testkit::with_temp_db;
///
/// #[test]
/// fn my_test() {
///     with_temp_db(|db| {
///         assert!(db.tables().is_empty());
///     });
/// }
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let store = TestStore::new();
    f(&store.db)
}

/// Converts a JSON object literal into a document.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(document) => document,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// The two-person table used throughout the scenario tests.
pub fn people() -> Vec<Document> {
    vec![
        doc(json!({"name": "a", "age": 5})),
        doc(json!({"name": "b", "age": 3})),
    ]
}

/// `count` documents `{"id": i, "group": i % groups, "label": "item-<i>"}`.
pub fn numbered(count: usize, groups: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            doc(json!({
                "id": i,
                "group": i % groups.max(1),
                "label": format!("item-{i}"),
            }))
        })
        .collect()
}
