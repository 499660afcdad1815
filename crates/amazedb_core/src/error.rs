//! Error types for AmazeDB core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in AmazeDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The named database does not exist.
    #[error("database not found: {name}")]
    DbNotFound {
        /// Name of the database.
        name: String,
    },

    /// The named database already exists.
    #[error("database already exists: {name}")]
    DbExists {
        /// Name of the database.
        name: String,
    },

    /// Ciphertext could not be authenticated or decrypted.
    #[error("decryption failed: {message}")]
    DecryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Invalid key size.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// A table with this name already exists.
    #[error("table already exists: {name}")]
    GroupExists {
        /// Name of the table.
        name: String,
    },

    /// The named table does not exist.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Name of the table.
        name: String,
    },

    /// Unknown filter operator or a custom predicate that failed.
    #[error("invalid filter on field `{field}`: {message}")]
    InvalidFilter {
        /// Field the filter was attached to.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// A `__re` operand that is not a valid regular expression.
    #[error("invalid regular expression `{pattern}`: {message}")]
    InvalidRegExp {
        /// The rejected pattern.
        pattern: String,
        /// Description from the regex compiler.
        message: String,
    },

    /// A sort was requested on a field some document does not carry.
    #[error("sort field `{field}` is not present in all documents")]
    SortFieldMissing {
        /// The sort field.
        field: String,
    },

    /// A database or table name failed validation.
    #[error("invalid {kind} name `{name}`: only letters, digits, `-` and `_` are allowed")]
    InvalidName {
        /// What was being named (`database` or `table`).
        kind: &'static str,
        /// The rejected name.
        name: String,
    },

    /// An export package was not found at the given path.
    #[error("export package not found: {}", path.display())]
    ExportNotFound {
        /// Path that was searched.
        path: PathBuf,
    },

    /// Invalid on-disk format.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl CoreError {
    /// Creates a decryption failed error.
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            message: message.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid key size error.
    pub fn invalid_key_size(actual: usize, expected: usize) -> Self {
        Self::InvalidKeySize { expected, actual }
    }

    /// Creates an invalid filter error.
    pub fn invalid_filter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid regular expression error.
    pub fn invalid_regexp(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRegExp {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates a sort field missing error.
    pub fn sort_field_missing(field: impl Into<String>) -> Self {
        Self::SortFieldMissing {
            field: field.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
