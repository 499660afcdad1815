//! # AmazeDB Core
//!
//! Embedded document store with encryption at rest.
//!
//! A [`Database`] is a directory holding a plaintext metadata file and one
//! AES-256-GCM sealed file per [`Table`]. Each table file is a JSON array of
//! [`Document`]s; every read decrypts the whole file and every write
//! re-encrypts and replaces it.
//!
//! This crate provides:
//! - [`Cipher`] for sealing and opening blobs
//! - A stable merge sort and lower-bound binary search over documents
//! - The filter engine ([`Filters`], [`FieldFilter`], [`Operator`])
//! - [`Table`] CRUD and [`Database`] lifecycle
//! - Export and import of whole databases
//!
//! ## Example
//!
//! ```rust,no_run
//! use amazedb_core::{Config, Database, Filters};
//! use serde_json::json;
//!
//! # fn main() -> amazedb_core::CoreResult<()> {
//! let db = Database::open("data", "shop", Config::default())?;
//! let users = db.create_table("users")?;
//!
//! let alice = json!({"name": "alice", "age": 31});
//! if let serde_json::Value::Object(document) = alice {
//!     users.insert(document)?;
//! }
//!
//! let adults = users.get(&Filters::new().gte("age", 18), Some("name"))?;
//! assert_eq!(adults.len(), 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithms;
mod backup;
mod config;
mod crypto;
mod database;
mod dir;
mod document;
mod error;
mod filter;
mod metadata;
mod table;

pub use backup::{read_export_info, ExportInfo, ExportReceipt, ImportStats};
pub use config::Config;
pub use crypto::{Cipher, EncryptionKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use database::Database;
pub use dir::{validate_name, EXPORT_EXTENSION, TABLE_EXTENSION};
pub use document::{compare_values, merge_patch, partial_compare, values_equal, Document};
pub use error::{CoreError, CoreResult};
pub use filter::{
    matches, FieldFilter, Filters, MatchOutcome, Operator, Predicate, PredicateError,
    PredicateRegistry,
};
pub use metadata::Metadata;
pub use table::Table;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
