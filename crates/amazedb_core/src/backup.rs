//! Export and import of whole databases.
//!
//! An export package is a single sealed file `<dir>/<name>.amazedb`. Opened
//! with the export key it yields JSON:
//!
//! ```text
//! {
//!   "name": "shop",
//!   "key": "<base64 database key>",
//!   "created_at": 1700000000000,
//!   "tables": [{"name": "users", "data": "<base64 sealed table file>"}]
//! }
//! ```
//!
//! Table files are carried as-is, still sealed under the database key, so an
//! export never decrypts table contents. The export key is generated fresh
//! for every export and handed back to the caller; it is not stored anywhere.
//!
//! Import replaces the target database's key and table set with the
//! package's. Every table in the package is checked against the packaged key
//! before anything on disk changes.

use crate::crypto::{Cipher, EncryptionKey};
use crate::database::Database;
use crate::dir::{validate_name, write_atomic, DatabaseDir, EXPORT_EXTENSION};
use crate::document::Document;
use crate::error::{CoreError, CoreResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

#[derive(Serialize, Deserialize)]
struct ExportPackage {
    name: String,
    key: String,
    #[serde(default)]
    created_at: u64,
    tables: Vec<ExportedTable>,
}

#[derive(Serialize, Deserialize)]
struct ExportedTable {
    name: String,
    data: String,
}

/// Result of [`Database::export`].
#[derive(Clone)]
pub struct ExportReceipt {
    /// Path of the written package.
    pub path: PathBuf,
    /// Base64 export key needed to import the package.
    pub key: String,
    /// Number of tables in the package.
    pub tables: usize,
}

impl std::fmt::Debug for ExportReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportReceipt")
            .field("path", &self.path)
            .field("key", &"[REDACTED]")
            .field("tables", &self.tables)
            .finish()
    }
}

/// Statistics from [`Database::import_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Tables written from the package.
    pub tables_imported: usize,
    /// Tables that existed before the import but not in the package.
    pub tables_removed: usize,
    /// Documents across all imported tables.
    pub documents: usize,
}

/// Summary of an export package, see [`read_export_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    /// Name of the exported database.
    pub name: String,
    /// When the package was written (Unix millis, 0 if unknown).
    pub created_at: u64,
    /// Table names in package order.
    pub tables: Vec<String>,
    /// Size of the package file in bytes.
    pub size: usize,
}

impl Database {
    /// Writes an export package for this database into `dir`.
    ///
    /// `dir` is created if missing. An existing package of the same name is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if a registered table's file is
    /// missing.
    pub fn export(&self, dir: impl AsRef<Path>) -> CoreResult<ExportReceipt> {
        let dir = dir.as_ref();
        let state = self.shared.state.read();

        let mut tables = Vec::with_capacity(state.metadata.tables.len());
        for table in &state.metadata.tables {
            let sealed = match fs::read(self.shared.dir.table_path(table)) {
                Ok(data) => data,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(CoreError::TableNotFound {
                        name: table.clone(),
                    })
                }
                Err(e) => return Err(e.into()),
            };
            tables.push(ExportedTable {
                name: table.clone(),
                data: STANDARD.encode(sealed),
            });
        }

        let package = ExportPackage {
            name: self.shared.name.clone(),
            key: state.metadata.key.clone(),
            created_at: now_millis(),
            tables,
        };
        drop(state);

        let export_key = EncryptionKey::generate();
        let sealed = Cipher::new(&export_key).encrypt(&serde_json::to_vec(&package)?)?;

        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.{EXPORT_EXTENSION}", self.shared.name));
        write_atomic(&path, &sealed, self.shared.dir.sync())?;

        info!(
            database = %self.shared.name,
            path = %path.display(),
            tables = package.tables.len(),
            "exported database"
        );
        Ok(ExportReceipt {
            path,
            key: export_key.to_base64(),
            tables: package.tables.len(),
        })
    }

    /// Replaces this database's key and tables with those of the package at
    /// `path`, opened with the base64 export `key`.
    ///
    /// The database keeps its own name. Tables not in the package are
    /// deleted. Existing [`Table`](crate::Table) handles see the imported
    /// contents on their next operation.
    ///
    /// New table files are staged next to the live ones and only moved into
    /// place once `metadata.json` holds the packaged key. An import that fails
    /// before that point leaves the database untouched.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ExportNotFound`] if `path` is not a file.
    /// - [`CoreError::DecryptionFailed`] if `key` is malformed or wrong, or a
    ///   packaged table does not open with the packaged key.
    /// - [`CoreError::Json`] / [`CoreError::InvalidFormat`] if the package
    ///   content is malformed.
    pub fn import_data(&self, path: impl AsRef<Path>, key: &str) -> CoreResult<ImportStats> {
        let path = path.as_ref();
        let (package, _) = open_package(path, key)?;

        let table_key = EncryptionKey::from_base64(&package.key)?;
        let cipher = Cipher::new(&table_key);

        let mut seen = HashSet::new();
        let mut blobs = Vec::with_capacity(package.tables.len());
        let mut documents = 0;
        for table in &package.tables {
            validate_name("table", &table.name)?;
            if !seen.insert(table.name.as_str()) {
                return Err(CoreError::invalid_format(format!(
                    "duplicate table in export: {}",
                    table.name
                )));
            }

            let sealed = STANDARD.decode(&table.data).map_err(|e| {
                CoreError::invalid_format(format!("table {}: bad base64: {e}", table.name))
            })?;
            let rows: Vec<Document> = serde_json::from_slice(&cipher.decrypt(&sealed)?)?;
            documents += rows.len();
            blobs.push((table.name.as_str(), sealed));
        }

        let mut state = self.shared.state.write();
        let dir = &self.shared.dir;

        // Stage every table before touching the live files. Until metadata
        // carries the new key, a failure leaves the database as it was.
        for (table, sealed) in &blobs {
            if let Err(e) = write_atomic(&dir.staged_path(table), sealed, dir.sync()) {
                discard_staged(dir, &blobs);
                return Err(e);
            }
        }

        let mut metadata = state.metadata.clone();
        metadata.tables = package.tables.iter().map(|t| t.name.clone()).collect();
        metadata.key = package.key.clone();
        if let Err(e) = dir.save_metadata(&metadata) {
            discard_staged(dir, &blobs);
            return Err(e);
        }

        let obsolete: Vec<String> = state
            .metadata
            .tables
            .iter()
            .filter(|table| !seen.contains(table.as_str()))
            .cloned()
            .collect();
        state.metadata = metadata;
        state.cipher = Arc::new(cipher);
        state.generation += 1;

        // Committed. Staged files left behind by a failure here are moved
        // into place the next time the database is opened.
        for (table, _) in &blobs {
            dir.commit_staged(table)?;
        }
        for table in &obsolete {
            if let Err(e) = dir.remove_table_file(table) {
                warn!(
                    database = %self.shared.name,
                    table = %table,
                    error = %e,
                    "could not remove table file"
                );
            }
        }
        let removed = obsolete.len();

        let stats = ImportStats {
            tables_imported: blobs.len(),
            tables_removed: removed,
            documents,
        };
        info!(
            database = %self.shared.name,
            from = %package.name,
            tables = stats.tables_imported,
            removed = stats.tables_removed,
            documents = stats.documents,
            "imported database"
        );
        Ok(stats)
    }
}

fn discard_staged(dir: &DatabaseDir, blobs: &[(&str, Vec<u8>)]) {
    for (table, _) in blobs {
        if let Err(e) = dir.discard_staged(table) {
            warn!(table = %table, error = %e, "could not remove staged table file");
        }
    }
}

/// Opens the package at `path` with export `key` and summarises it without
/// applying it.
pub fn read_export_info(path: impl AsRef<Path>, key: &str) -> CoreResult<ExportInfo> {
    let (package, size) = open_package(path.as_ref(), key)?;
    Ok(ExportInfo {
        name: package.name,
        created_at: package.created_at,
        tables: package.tables.into_iter().map(|t| t.name).collect(),
        size,
    })
}

fn open_package(path: &Path, key: &str) -> CoreResult<(ExportPackage, usize)> {
    if !path.is_file() {
        return Err(CoreError::ExportNotFound {
            path: path.to_path_buf(),
        });
    }

    let export_key = EncryptionKey::from_base64(key)
        .map_err(|e| CoreError::decryption_failed(format!("unusable export key: {e}")))?;
    let sealed = fs::read(path)?;
    let package = serde_json::from_slice(&Cipher::new(&export_key).decrypt(&sealed)?)?;
    Ok((package, sealed.len()))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Filters};
    use serde_json::json;
    use tempfile::tempdir;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn config() -> Config {
        Config::default().sync_on_write(false)
    }

    fn populated(root: &Path, name: &str) -> Database {
        let db = Database::create(root, name, config()).unwrap();
        let users = db.create_table("users").unwrap();
        users
            .insert_many([doc(json!({"name": "a"})), doc(json!({"name": "b"}))])
            .unwrap();
        db.create_table("orders")
            .unwrap()
            .insert(doc(json!({"id": 1})))
            .unwrap();
        db
    }

    #[test]
    fn export_then_import_into_other_database() {
        let temp = tempdir().unwrap();
        let source = populated(temp.path(), "source");

        let receipt = source.export(temp.path().join("out")).unwrap();
        assert_eq!(receipt.path, temp.path().join("out").join("source.amazedb"));
        assert_eq!(receipt.tables, 2);

        let target = Database::create(temp.path(), "target", config()).unwrap();
        target.create_table("stale").unwrap();

        let stats = target.import_data(&receipt.path, &receipt.key).unwrap();
        assert_eq!(
            stats,
            ImportStats {
                tables_imported: 2,
                tables_removed: 1,
                documents: 3,
            }
        );

        assert_eq!(target.name(), "target");
        assert_eq!(target.tables(), vec!["users", "orders"]);
        assert!(!target.path().join("stale.tables").exists());
        assert!(!target.path().join("users.tables.import").exists());
        let users = target.load_table("users").unwrap();
        assert_eq!(users.get(&Filters::new(), Some("name")).unwrap().len(), 2);

        // Survives a reopen with the imported key.
        let reopened = Database::open(temp.path(), "target", config()).unwrap();
        let orders = reopened.load_table("orders").unwrap();
        assert_eq!(orders.all().unwrap(), vec![doc(json!({"id": 1}))]);
    }

    #[test]
    fn failed_import_leaves_database_intact() {
        let temp = tempdir().unwrap();
        let receipt = populated(temp.path(), "source").export(temp.path()).unwrap();

        let target = Database::create(temp.path(), "target", config()).unwrap();
        let users = target.create_table("users").unwrap();
        users.insert(doc(json!({"name": "kept"}))).unwrap();

        // Staging the second table fails: its temp path is taken by a directory.
        fs::create_dir(target.path().join("orders.tables.import.tmp")).unwrap();
        assert!(matches!(
            target.import_data(&receipt.path, &receipt.key),
            Err(CoreError::Io(_))
        ));

        assert_eq!(target.tables(), vec!["users"]);
        assert_eq!(users.all().unwrap(), vec![doc(json!({"name": "kept"}))]);
        assert!(!target.path().join("users.tables.import").exists());

        let reopened = Database::open(temp.path(), "target", config()).unwrap();
        let users = reopened.load_table("users").unwrap();
        assert_eq!(users.all().unwrap(), vec![doc(json!({"name": "kept"}))]);
    }

    #[test]
    fn package_is_sealed() {
        let temp = tempdir().unwrap();
        let receipt = populated(temp.path(), "shop").export(temp.path()).unwrap();
        let raw = fs::read(&receipt.path).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("users"));
    }

    #[test]
    fn import_refreshes_preloaded_handles() {
        let temp = tempdir().unwrap();
        let receipt = populated(temp.path(), "source").export(temp.path()).unwrap();

        let target =
            Database::create(temp.path(), "target", config().preload(true)).unwrap();
        let users = target.create_table("users").unwrap();
        assert_eq!(users.count().unwrap(), 0);

        target.import_data(&receipt.path, &receipt.key).unwrap();
        assert_eq!(users.count().unwrap(), 2);
    }

    #[test]
    fn wrong_key_is_decryption_failure() {
        let temp = tempdir().unwrap();
        let db = populated(temp.path(), "shop");
        let receipt = db.export(temp.path()).unwrap();

        let other = EncryptionKey::generate().to_base64();
        assert!(matches!(
            db.import_data(&receipt.path, &other),
            Err(CoreError::DecryptionFailed { .. })
        ));
        assert!(matches!(
            db.import_data(&receipt.path, "not base64!"),
            Err(CoreError::DecryptionFailed { .. })
        ));

        // Nothing changed.
        assert_eq!(db.load_table("users").unwrap().count().unwrap(), 2);
    }

    #[test]
    fn missing_package_is_export_not_found() {
        let temp = tempdir().unwrap();
        let db = Database::create(temp.path(), "shop", config()).unwrap();
        let key = EncryptionKey::generate().to_base64();

        assert!(matches!(
            db.import_data(temp.path().join("nope.amazedb"), &key),
            Err(CoreError::ExportNotFound { .. })
        ));
        assert!(matches!(
            read_export_info(temp.path().join("nope.amazedb"), &key),
            Err(CoreError::ExportNotFound { .. })
        ));
    }

    #[test]
    fn export_info_summarises_package() {
        let temp = tempdir().unwrap();
        let receipt = populated(temp.path(), "shop").export(temp.path()).unwrap();

        let info = read_export_info(&receipt.path, &receipt.key).unwrap();
        assert_eq!(info.name, "shop");
        assert_eq!(info.tables, vec!["users", "orders"]);
        assert!(info.created_at > 0);
        assert_eq!(info.size, fs::metadata(&receipt.path).unwrap().len() as usize);
    }

    #[test]
    fn export_empty_database() {
        let temp = tempdir().unwrap();
        let db = Database::create(temp.path(), "empty", config()).unwrap();
        let receipt = db.export(temp.path()).unwrap();
        assert_eq!(receipt.tables, 0);

        let stats = db.import_data(&receipt.path, &receipt.key).unwrap();
        assert_eq!(stats, ImportStats::default());
    }

    #[test]
    fn receipt_debug_hides_key() {
        let temp = tempdir().unwrap();
        let receipt = populated(temp.path(), "shop").export(temp.path()).unwrap();
        assert!(!format!("{receipt:?}").contains(&receipt.key));
    }
}
