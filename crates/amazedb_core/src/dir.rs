//! Database directory management.
//!
//! This module handles the file system layout for AmazeDB:
//!
//! ```text
//! <root>/
//! └─ db/
//!    └─ <db_name>/
//!       ├─ metadata.json      # name, table list, key
//!       ├─ users.tables       # one encrypted blob per table
//!       └─ orders.tables
//! ```
//!
//! Every rewrite goes through [`write_atomic`]: the new content is written to
//! a sibling temporary file and renamed over the target, so a reader sees
//! either the old or the new file, never a partial one.

use crate::error::{CoreError, CoreResult};
use crate::metadata::Metadata;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory under the storage root that holds all databases.
pub const DB_ROOT_DIR: &str = "db";
/// Metadata file name within a database directory.
pub const METADATA_FILE: &str = "metadata.json";
/// Extension of table files.
pub const TABLE_EXTENSION: &str = "tables";
/// Extension of export packages.
pub const EXPORT_EXTENSION: &str = "amazedb";
const TEMP_SUFFIX: &str = ".tmp";
/// Suffix of table files staged by an import, e.g. `users.tables.import`.
pub const STAGED_SUFFIX: &str = ".import";

/// Checks that `name` is non-empty and uses only `[A-Za-z0-9_-]`.
pub fn validate_name(kind: &'static str, name: &str) -> CoreResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Returns `<root>/db`.
#[must_use]
pub fn databases_root(root: &Path) -> PathBuf {
    root.join(DB_ROOT_DIR)
}

/// Replaces the file at `path` with `data` via write-then-rename.
///
/// With `sync` set, the temporary file is fsynced before the rename and the
/// parent directory after it.
pub fn write_atomic(path: &Path, data: &[u8], sync: bool) -> CoreResult<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(TEMP_SUFFIX);
    let temp_path = PathBuf::from(temp_name);

    let result = (|| {
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        if sync {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        // Best effort: don't leave the temporary behind.
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    if sync {
        if let Some(parent) = path.parent() {
            sync_directory(parent)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> CoreResult<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> CoreResult<()> {
    // NTFS journals metadata updates; directory handles can't be fsynced.
    Ok(())
}

fn remove_if_present(path: &Path) -> CoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A database's directory on disk.
#[derive(Debug, Clone)]
pub struct DatabaseDir {
    path: PathBuf,
    sync: bool,
}

impl DatabaseDir {
    /// Describes the directory of database `name` under `root`.
    ///
    /// Nothing is touched on disk.
    #[must_use]
    pub fn new(root: &Path, name: &str, sync: bool) -> Self {
        Self {
            path: databases_root(root).join(name),
            sync,
        }
    }

    /// Whether the directory exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Creates the directory (and `<root>/db` if needed).
    pub fn create(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    /// Returns the path to the database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether rewrites are fsynced.
    #[must_use]
    pub fn sync(&self) -> bool {
        self.sync
    }

    /// Returns the path to `metadata.json`.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE)
    }

    /// Returns the path to a table's file.
    #[must_use]
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.path.join(format!("{table}.{TABLE_EXTENSION}"))
    }

    /// Returns the path an import stages a table's new file at.
    #[must_use]
    pub fn staged_path(&self, table: &str) -> PathBuf {
        self.path.join(format!("{table}.{TABLE_EXTENSION}{STAGED_SUFFIX}"))
    }

    /// Moves a staged table file over the live one.
    pub fn commit_staged(&self, table: &str) -> CoreResult<()> {
        fs::rename(self.staged_path(table), self.table_path(table))?;
        if self.sync {
            sync_directory(&self.path)?;
        }
        Ok(())
    }

    /// Deletes a staged table file. Missing files are not an error.
    pub fn discard_staged(&self, table: &str) -> CoreResult<()> {
        remove_if_present(&self.staged_path(table))
    }

    /// Lists the table names that have a staged file, sorted.
    pub fn list_staged(&self) -> CoreResult<Vec<String>> {
        let suffix = format!(".{TABLE_EXTENSION}{STAGED_SUFFIX}");
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(table) = file_name.to_str().and_then(|n| n.strip_suffix(&suffix)) {
                tables.push(table.to_string());
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Loads `metadata.json`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the file is missing and
    /// [`CoreError::Json`] if it does not parse.
    pub fn load_metadata(&self) -> CoreResult<Metadata> {
        let path = self.metadata_path();
        if !path.exists() {
            return Err(CoreError::invalid_format(format!(
                "missing metadata file: {}",
                path.display()
            )));
        }
        Metadata::decode(&fs::read(path)?)
    }

    /// Saves `metadata.json` atomically.
    pub fn save_metadata(&self, metadata: &Metadata) -> CoreResult<()> {
        write_atomic(&self.metadata_path(), &metadata.encode()?, self.sync)
    }

    /// Lists the table names that have a file in the directory, sorted.
    pub fn list_table_files(&self) -> CoreResult<Vec<String>> {
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tables.push(stem.to_string());
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Deletes a table's file. Missing files are not an error.
    pub fn remove_table_file(&self, table: &str) -> CoreResult<()> {
        remove_if_present(&self.table_path(table))
    }

    /// Recursively deletes the database directory.
    pub fn remove_all(&self) -> CoreResult<()> {
        fs::remove_dir_all(&self.path)?;
        Ok(())
    }
}
