//! Database metadata file.
//!
//! `metadata.json` is plaintext JSON:
//!
//! ```text
//! {"name": "shop", "tables": ["users", "orders"], "key": "<base64 key>"}
//! ```
//!
//! The `tables` list mirrors the `*.tables` files in the database directory
//! and keeps their creation order.

use crate::crypto::EncryptionKey;
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};

/// Contents of `metadata.json`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Database name.
    pub name: String,
    /// Registered table names, in creation order.
    pub tables: Vec<String>,
    /// Base64 encoding of the database key.
    pub key: String,
}

impl Metadata {
    /// Creates metadata for a new, empty database.
    #[must_use]
    pub fn new(name: impl Into<String>, key: &EncryptionKey) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            key: key.to_base64(),
        }
    }

    /// Decodes the stored key.
    pub fn encryption_key(&self) -> CoreResult<EncryptionKey> {
        EncryptionKey::from_base64(&self.key)
    }

    /// Whether `table` is registered.
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    /// Registers `table` if absent. Returns `true` if it was added.
    pub fn add_table(&mut self, table: &str) -> bool {
        if self.has_table(table) {
            return false;
        }
        self.tables.push(table.to_string());
        true
    }

    /// Deregisters `table`. Returns `true` if it was present.
    pub fn remove_table(&mut self, table: &str) -> bool {
        let before = self.tables.len();
        self.tables.retain(|t| t != table);
        self.tables.len() != before
    }

    /// Encodes to pretty-printed JSON.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decodes from JSON bytes.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

impl std::fmt::Debug for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metadata")
            .field("name", &self.name)
            .field("tables", &self.tables)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn new_metadata() {
        let key = EncryptionKey::generate();
        let metadata = Metadata::new("shop", &key);
        assert_eq!(metadata.name, "shop");
        assert!(metadata.tables.is_empty());
        assert_eq!(metadata.encryption_key().unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn add_and_remove_tables() {
        let mut metadata = Metadata::new("shop", &EncryptionKey::generate());

        assert!(metadata.add_table("users"));
        assert!(metadata.add_table("orders"));
        assert!(!metadata.add_table("users"));
        assert_eq!(metadata.tables, vec!["users", "orders"]);

        assert!(metadata.remove_table("users"));
        assert!(!metadata.remove_table("users"));
        assert_eq!(metadata.tables, vec!["orders"]);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut metadata = Metadata::new("shop", &EncryptionKey::generate());
        metadata.add_table("users");

        let decoded = Metadata::decode(&metadata.encode().unwrap()).unwrap();
        assert_eq!(decoded.name, "shop");
        assert_eq!(decoded.tables, vec!["users"]);
        assert_eq!(decoded.key, metadata.key);
    }

    #[test]
    fn decode_uses_plain_field_names() {
        let raw = br#"{"name": "x", "tables": ["t"], "key": "AAAA"}"#;
        let metadata = Metadata::decode(raw).unwrap();
        assert_eq!(metadata.tables, vec!["t"]);
        assert!(matches!(
            metadata.encryption_key(),
            Err(CoreError::InvalidKeySize { .. })
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            Metadata::decode(b"not json"),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let metadata = Metadata::new("shop", &EncryptionKey::generate());
        assert!(!format!("{metadata:?}").contains(&metadata.key));
    }
}
