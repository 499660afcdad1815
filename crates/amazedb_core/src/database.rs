//! Database facade.

use crate::config::Config;
use crate::crypto::{Cipher, EncryptionKey};
use crate::dir::{databases_root, validate_name, DatabaseDir};
use crate::error::{CoreError, CoreResult};
use crate::metadata::Metadata;
use crate::table::Table;
use parking_lot::RwLock;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State shared by a database handle and every table handle it gave out.
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) dir: DatabaseDir,
    pub(crate) config: Config,
    pub(crate) state: RwLock<State>,
}

/// Mutable part of [`Shared`].
pub(crate) struct State {
    pub(crate) metadata: Metadata,
    pub(crate) cipher: Arc<Cipher>,
    /// Bumped on every table write, drop and import. Preload mirrors from an
    /// older generation are stale.
    pub(crate) generation: u64,
}

impl Shared {
    /// Current cipher and generation.
    pub(crate) fn cipher(&self) -> (Arc<Cipher>, u64) {
        let state = self.state.read();
        (Arc::clone(&state.cipher), state.generation)
    }

    pub(crate) fn drop_table(&self, table: &str) -> CoreResult<()> {
        let mut state = self.state.write();
        if !state.metadata.has_table(table) {
            return Err(CoreError::TableNotFound {
                name: table.to_string(),
            });
        }

        let mut metadata = state.metadata.clone();
        metadata.remove_table(table);
        self.dir.save_metadata(&metadata)?;
        state.metadata = metadata;
        state.generation += 1;
        self.dir.remove_table_file(table)?;

        info!(database = %self.name, table, "dropped table");
        Ok(())
    }
}

/// The main database handle.
///
/// A database is a directory `<root>/db/<name>/` holding a plaintext
/// `metadata.json` (name, table list, key) and one encrypted file per table.
/// Handles are cheap to clone; clones and the [`Table`]s they hand out share
/// the same metadata and key.
///
/// # Safe mode
///
/// With [`Config::safe_mode`] on (the default), "already exists" and
/// "not found" conditions are absorbed: creating an existing database or
/// table opens it, opening a missing one creates it. With it off those
/// conditions surface as [`CoreError::DbExists`], [`CoreError::DbNotFound`],
/// [`CoreError::GroupExists`] and [`CoreError::TableNotFound`].
///
/// # Example
///
/// ```rust,ignore
/// use amazedb_core::{Config, Database};
///
/// let db = Database::open("/var/lib/app", "shop", Config::default())?;
/// let users = db.create_table("users")?;
/// println!("{:?}", db.tables());
/// ```
#[derive(Clone)]
pub struct Database {
    pub(crate) shared: Arc<Shared>,
}

impl Database {
    /// Creates database `name` under `root`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidName`] if `name` is not `[A-Za-z0-9_-]+`.
    /// - [`CoreError::DbExists`] if it already exists and safe mode is off.
    pub fn create(root: impl AsRef<Path>, name: &str, config: Config) -> CoreResult<Self> {
        let root = root.as_ref();
        validate_name("database", name)?;

        let dir = DatabaseDir::new(root, name, config.sync_on_write);
        if dir.exists() {
            if config.safe_mode {
                debug!(database = name, "database exists, opening");
                return Self::load(dir, name, config);
            }
            return Err(CoreError::DbExists {
                name: name.to_string(),
            });
        }

        dir.create()?;
        let key = EncryptionKey::generate();
        let metadata = Metadata::new(name, &key);
        dir.save_metadata(&metadata)?;

        info!(database = name, path = %dir.path().display(), "created database");
        Ok(Self::from_parts(dir, name, config, metadata, Cipher::new(&key)))
    }

    /// Opens database `name` under `root`.
    ///
    /// On open the registered table list is checked against the table files
    /// in the directory and rewritten if they disagree.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidName`] if `name` is not `[A-Za-z0-9_-]+`.
    /// - [`CoreError::DbNotFound`] if `<root>/db` or the database directory is
    ///   missing and safe mode is off.
    /// - [`CoreError::InvalidFormat`] if `metadata.json` is missing or its key
    ///   is not valid base64.
    pub fn open(root: impl AsRef<Path>, name: &str, config: Config) -> CoreResult<Self> {
        let root = root.as_ref();
        validate_name("database", name)?;

        let dir = DatabaseDir::new(root, name, config.sync_on_write);
        if !databases_root(root).is_dir() || !dir.exists() {
            if config.safe_mode {
                return Self::create(root, name, config);
            }
            return Err(CoreError::DbNotFound {
                name: name.to_string(),
            });
        }

        Self::load(dir, name, config)
    }

    fn load(dir: DatabaseDir, name: &str, config: Config) -> CoreResult<Self> {
        let mut metadata = dir.load_metadata()?;
        let cipher = Cipher::new(&metadata.encryption_key()?);
        settle_staged(&dir, name, &metadata, &cipher)?;
        reconcile(&dir, name, &mut metadata)?;

        debug!(database = name, tables = metadata.tables.len(), "opened database");
        Ok(Self::from_parts(dir, name, config, metadata, cipher))
    }

    fn from_parts(
        dir: DatabaseDir,
        name: &str,
        config: Config,
        metadata: Metadata,
        cipher: Cipher,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.to_string(),
                dir,
                config,
                state: RwLock::new(State {
                    metadata,
                    cipher: Arc::new(cipher),
                    generation: 0,
                }),
            }),
        }
    }

    /// Database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.shared.dir.path()
    }

    /// Configuration the database was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Registered table names in creation order.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        self.shared.state.read().metadata.tables.clone()
    }

    /// Whether `table` is registered.
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.shared.state.read().metadata.has_table(table)
    }

    /// Creates table `name` and returns a handle to it.
    ///
    /// The new table file holds an encrypted empty collection and the name is
    /// appended to `metadata.json`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidName`] if `name` is not `[A-Za-z0-9_-]+`.
    /// - [`CoreError::GroupExists`] if it exists and safe mode is off.
    pub fn create_table(&self, name: &str) -> CoreResult<Table> {
        validate_name("table", name)?;

        if self.has_table(name) {
            if self.shared.config.safe_mode {
                return Ok(Table::new(name, Arc::clone(&self.shared)));
            }
            return Err(CoreError::GroupExists {
                name: name.to_string(),
            });
        }

        self.register_table(name)?;
        Ok(Table::new(name, Arc::clone(&self.shared)))
    }

    /// Returns a handle to existing table `name`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidName`] if `name` is not `[A-Za-z0-9_-]+`.
    /// - [`CoreError::TableNotFound`] if it is absent and safe mode is off.
    pub fn load_table(&self, name: &str) -> CoreResult<Table> {
        validate_name("table", name)?;

        if !self.has_table(name) {
            if !self.shared.config.safe_mode {
                return Err(CoreError::TableNotFound {
                    name: name.to_string(),
                });
            }
            self.register_table(name)?;
        }
        Ok(Table::new(name, Arc::clone(&self.shared)))
    }

    fn register_table(&self, name: &str) -> CoreResult<()> {
        let mut state = self.shared.state.write();
        // Lost a race with another handle; the table is there now.
        if state.metadata.has_table(name) {
            return Ok(());
        }

        let path = self.shared.dir.table_path(name);
        Table::write_empty(&path, &state.cipher, self.shared.dir.sync())?;

        state.metadata.add_table(name);
        if let Err(e) = self.shared.dir.save_metadata(&state.metadata) {
            state.metadata.remove_table(name);
            let _ = self.shared.dir.remove_table_file(name);
            return Err(e);
        }

        info!(database = %self.shared.name, table = name, "created table");
        Ok(())
    }

    /// Deletes table `name`: its file and its metadata entry.
    ///
    /// Other handles to the table fail with [`CoreError::TableNotFound`]
    /// afterwards.
    pub fn drop_table(&self, name: &str) -> CoreResult<()> {
        self.shared.drop_table(name)
    }

    /// Recursively deletes the database directory.
    pub fn drop(self) -> CoreResult<()> {
        self.shared.dir.remove_all()?;
        info!(database = %self.shared.name, "dropped database");
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.shared.name)
            .field("path", &self.shared.dir.path())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Makes `metadata.tables` agree with the table files present.
///
/// Registered tables whose file is gone are dropped from the list; table files
/// that are not registered are appended in name order.
fn reconcile(dir: &DatabaseDir, name: &str, metadata: &mut Metadata) -> CoreResult<()> {
    let mut on_disk = Vec::new();
    for table in dir.list_table_files()? {
        match validate_name("table", &table) {
            Ok(()) => on_disk.push(table),
            Err(_) => warn!(
                database = name,
                file = %table,
                "ignoring table file with invalid name"
            ),
        }
    }

    let mut tables: Vec<String> = metadata
        .tables
        .iter()
        .filter(|table| on_disk.contains(table))
        .cloned()
        .collect();
    for table in on_disk {
        if !tables.contains(&table) {
            tables.push(table);
        }
    }

    if tables == metadata.tables && metadata.name == name {
        return Ok(());
    }

    warn!(
        database = name,
        registered = ?metadata.tables,
        found = ?tables,
        "metadata out of sync with table files, rewriting"
    );
    metadata.tables = tables;
    metadata.name = name.to_string();
    dir.save_metadata(metadata)
}

/// Deals with table files an interrupted import left staged.
///
/// A staged file that is registered and opens under the committed key belongs
/// to an import whose metadata was saved, so it is moved into place. Anything
/// else is left over from an import that never committed and is deleted.
fn settle_staged(
    dir: &DatabaseDir,
    name: &str,
    metadata: &Metadata,
    cipher: &Cipher,
) -> CoreResult<()> {
    for table in dir.list_staged()? {
        let committed = metadata.has_table(&table)
            && cipher.decrypt(&fs::read(dir.staged_path(&table))?).is_ok();
        if committed {
            warn!(database = name, table = %table, "finishing interrupted import");
            dir.commit_staged(&table)?;
        } else {
            warn!(database = name, table = %table, "discarding staged file of failed import");
            dir.discard_staged(&table)?;
        }
    }
    Ok(())
}
