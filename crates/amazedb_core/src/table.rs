//! Tables: encrypted document collections, one file each.
//!
//! Every operation works on the whole collection. A read decrypts the table
//! file and parses the JSON array; a write additionally re-serializes the
//! modified array, seals it, and replaces the file via write-then-rename.
//! There is no index and no log, so each mutation costs a full rewrite and
//! throughput falls with table size.
//!
//! With [`Config::preload`](crate::Config::preload) set, a table keeps the
//! decoded documents in memory and serves reads from that mirror. Writes still
//! go to disk first; the mirror is replaced only after the new file is in
//! place, so the two never disagree.
//!
//! Writes through handles of one [`Database`](crate::Database) are
//! serialized. Two handles over the same file in different processes can
//! lose each other's updates.

use crate::algorithms::{find_equal, order_by_field, sort_by_field};
use crate::crypto::Cipher;
use crate::database::Shared;
use crate::dir::write_atomic;
use crate::document::{merge_patch, Document};
use crate::error::{CoreError, CoreResult};
use crate::filter::Filters;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Decoded documents plus the database generation they were read under.
struct Mirror {
    generation: u64,
    documents: Vec<Document>,
}

/// Handle to one table of a [`Database`](crate::Database).
///
/// # Example
///
/// ```rust,ignore
/// use amazedb_core::{Database, Config, Filters};
/// use serde_json::json;
///
/// let db = Database::open(root, "shop", Config::default())?;
/// let users = db.load_table("users")?;
///
/// users.insert(doc(json!({"name": "a", "age": 5})))?;
/// let adult = users.get_one(&Filters::new().gt("age", 4), None)?;
/// ```
pub struct Table {
    name: String,
    path: PathBuf,
    shared: Arc<Shared>,
    mirror: Mutex<Option<Mirror>>,
}

impl Table {
    pub(crate) fn new(name: &str, shared: Arc<Shared>) -> Self {
        Self {
            name: name.to_string(),
            path: shared.dir.table_path(name),
            shared,
            mirror: Mutex::new(None),
        }
    }

    /// Writes an empty collection to `path`.
    pub(crate) fn write_empty(path: &Path, cipher: &Cipher, sync: bool) -> CoreResult<()> {
        let sealed = cipher.encrypt(b"[]")?;
        write_atomic(path, &sealed, sync)
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one document.
    pub fn insert(&self, document: Document) -> CoreResult<()> {
        self.mutate(|documents| {
            documents.push(document);
            Ok(((), true))
        })
    }

    /// Appends several documents in one rewrite. Returns how many were added.
    pub fn insert_many<I>(&self, documents: I) -> CoreResult<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let incoming: Vec<Document> = documents.into_iter().collect();
        let count = incoming.len();
        self.mutate(|documents| {
            documents.extend(incoming);
            Ok((count, count > 0))
        })
    }

    /// Returns the first document matching `filters`, or `None`.
    ///
    /// A query that is exactly one literal equality with no `sortby` is
    /// answered by sorting on that field and binary searching. Otherwise the
    /// documents are visited in `sortby` order (or stored order) and the
    /// first full match wins. Documents missing a filtered field never match.
    ///
    /// # Errors
    ///
    /// - [`CoreError::SortFieldMissing`] if `sortby` is absent from any document.
    /// - [`CoreError::InvalidFilter`] if a custom predicate fails.
    pub fn get_one(&self, filters: &Filters, sortby: Option<&str>) -> CoreResult<Option<Document>> {
        self.read(|documents| {
            Ok(locate_one(documents, filters, sortby)?.map(|i| documents[i].clone()))
        })
    }

    /// Returns every document matching `filters`, sorted by `sortby` if given.
    ///
    /// # Errors
    ///
    /// - [`CoreError::SortFieldMissing`] if `sortby` is absent from a match.
    /// - [`CoreError::InvalidFilter`] if a custom predicate fails.
    pub fn get(&self, filters: &Filters, sortby: Option<&str>) -> CoreResult<Vec<Document>> {
        self.read(|documents| {
            let matched: Vec<Document> = locate_all(documents, filters)?
                .into_iter()
                .map(|i| documents[i].clone())
                .collect();
            match sortby {
                Some(field) => sort_by_field(matched, field),
                None => Ok(matched),
            }
        })
    }

    /// Returns every document in stored order.
    pub fn all(&self) -> CoreResult<Vec<Document>> {
        self.read(|documents| Ok(documents.to_vec()))
    }

    /// Number of documents in the table.
    pub fn count(&self) -> CoreResult<usize> {
        self.read(|documents| Ok(documents.len()))
    }

    /// Merges `patch` into the first match. Returns 0 or 1.
    pub fn update_one(&self, filters: &Filters, patch: &Document) -> CoreResult<usize> {
        self.mutate(|documents| match locate_one(documents, filters, None)? {
            Some(i) => {
                documents[i] = merge_patch(&documents[i], patch);
                Ok((1, true))
            }
            None => Ok((0, false)),
        })
    }

    /// Merges `patch` into every match. Returns the number updated.
    pub fn update(&self, filters: &Filters, patch: &Document) -> CoreResult<usize> {
        self.mutate(|documents| {
            let hits = locate_all(documents, filters)?;
            for &i in &hits {
                documents[i] = merge_patch(&documents[i], patch);
            }
            Ok((hits.len(), !hits.is_empty()))
        })
    }

    /// Deletes the first match. Returns 0 or 1.
    pub fn remove_one(&self, filters: &Filters) -> CoreResult<usize> {
        self.mutate(|documents| match locate_one(documents, filters, None)? {
            Some(i) => {
                documents.remove(i);
                Ok((1, true))
            }
            None => Ok((0, false)),
        })
    }

    /// Deletes every match. Returns the number removed.
    pub fn remove(&self, filters: &Filters) -> CoreResult<usize> {
        self.mutate(|documents| {
            let mut doomed = vec![false; documents.len()];
            for i in locate_all(documents, filters)? {
                doomed[i] = true;
            }
            let removed = doomed.iter().filter(|&&d| d).count();

            let mut flags = doomed.into_iter();
            documents.retain(|_| !flags.next().unwrap_or(false));
            Ok((removed, removed > 0))
        })
    }

    /// Re-reads the backing file into the in-memory mirror.
    ///
    /// A no-op unless preloading is enabled.
    pub fn reload(&self) -> CoreResult<()> {
        if !self.shared.config.preload {
            return Ok(());
        }
        let (cipher, generation) = self.shared.cipher();
        let documents = self.read_file(&cipher)?;
        *self.mirror.lock() = Some(Mirror {
            generation,
            documents,
        });
        Ok(())
    }

    /// Deletes the backing file and deregisters the table from its database.
    pub fn drop(self) -> CoreResult<()> {
        self.shared.drop_table(&self.name)
    }

    fn read_file(&self, cipher: &Cipher) -> CoreResult<Vec<Document>> {
        let sealed = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::TableNotFound {
                    name: self.name.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let plaintext = cipher.decrypt(&sealed)?;
        let documents: Vec<Document> = serde_json::from_slice(&plaintext)?;
        debug!(table = %self.name, documents = documents.len(), "loaded table");
        Ok(documents)
    }

    fn write_file(&self, cipher: &Cipher, documents: &[Document]) -> CoreResult<()> {
        let plaintext = serde_json::to_vec(documents)?;
        let sealed = cipher.encrypt(&plaintext)?;
        write_atomic(&self.path, &sealed, self.shared.dir.sync())?;
        debug!(
            table = %self.name,
            documents = documents.len(),
            bytes = sealed.len(),
            "rewrote table"
        );
        Ok(())
    }

    /// Returns the mirror, re-reading the file if it is missing or stale.
    fn fresh_mirror<'a>(
        &self,
        slot: &'a mut Option<Mirror>,
        cipher: &Cipher,
        generation: u64,
    ) -> CoreResult<&'a mut Mirror> {
        let mirror = match slot.take() {
            Some(mirror) if mirror.generation == generation => mirror,
            _ => Mirror {
                generation,
                documents: self.read_file(cipher)?,
            },
        };
        Ok(slot.insert(mirror))
    }

    fn read<R>(&self, f: impl FnOnce(&[Document]) -> CoreResult<R>) -> CoreResult<R> {
        let (cipher, generation) = self.shared.cipher();
        if !self.shared.config.preload {
            return f(&self.read_file(&cipher)?);
        }

        let mut slot = self.mirror.lock();
        let mirror = self.fresh_mirror(&mut slot, &cipher, generation)?;
        f(&mirror.documents)
    }

    /// Runs `f` on a working copy of the documents and persists the copy if
    /// `f` reports a change. The mirror is only replaced after the write.
    ///
    /// Writers hold the database state lock for the whole read-modify-write,
    /// so two handles never rewrite from the same old contents. Each write
    /// bumps the generation, which sends sibling mirrors back to disk.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<Document>) -> CoreResult<(R, bool)>,
    ) -> CoreResult<R> {
        let mut state = self.shared.state.write();
        let cipher = Arc::clone(&state.cipher);
        let mut slot = self.mirror.lock();

        let mut documents = if self.shared.config.preload {
            self.fresh_mirror(&mut slot, &cipher, state.generation)?
                .documents
                .clone()
        } else {
            self.read_file(&cipher)?
        };

        let (result, changed) = f(&mut documents)?;
        if changed {
            self.write_file(&cipher, &documents)?;
            state.generation += 1;
            if self.shared.config.preload {
                *slot = Some(Mirror {
                    generation: state.generation,
                    documents,
                });
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("preload", &self.shared.config.preload)
            .finish()
    }
}

fn locate_one(
    documents: &[Document],
    filters: &Filters,
    sortby: Option<&str>,
) -> CoreResult<Option<usize>> {
    if let (None, Some((field, value))) = (sortby, filters.single_equality()) {
        return Ok(find_equal(documents, field, value));
    }

    let order = match sortby {
        Some(field) => order_by_field(documents, field)?,
        None => (0..documents.len()).collect(),
    };
    for i in order {
        if filters.matches(&documents[i])? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn locate_all(documents: &[Document], filters: &Filters) -> CoreResult<Vec<usize>> {
    let mut hits = Vec::new();
    for (i, document) in documents.iter().enumerate() {
        if filters.matches(document)? {
            hits.push(i);
        }
    }
    Ok(hits)
}
