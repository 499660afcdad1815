//! Benchmark utilities.

use amazedb_core::{Config, Database, Document};
use rand::Rng;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Generate a random lowercase string of the specified length.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// Generate `count` documents with a random `age` in `0..100`, a random
/// `name`, and a `payload` of `payload_size` characters.
pub fn generate_documents(count: usize, payload_size: usize) -> Vec<Document> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let value = json!({
                "id": i,
                "age": rng.gen_range(0..100),
                "name": random_string(8),
                "payload": random_string(payload_size),
            });
            match value {
                Value::Object(document) => document,
                _ => Document::new(),
            }
        })
        .collect()
}

/// A database in a temporary root, fsync off.
pub fn temp_database(config: Config) -> (TempDir, Database) {
    let dir = TempDir::new().unwrap_or_else(|e| panic!("temp dir: {e}"));
    let db = Database::create(dir.path(), "bench", config.sync_on_write(false))
        .unwrap_or_else(|e| panic!("create database: {e}"));
    (dir, db)
}
