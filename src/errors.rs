use std::io;

use thiserror::Error;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Represents a form submission that failed validation.
    #[error("Invalid entry: {}", summarize_validation_errors(.0))]
    Invalid(Vec<ValidationError>),

    /// Represents a reference to a record that doesn't exist.
    #[error("No record with ID {0}")]
    NonExistentId(String),

    /// Represents a configuration value that couldn't be used.
    #[error("Invalid configuration for {name}: {reason}")]
    Configuration { name: String, reason: String },
}

/// Enumerates errors returned by the key-value backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Represents an I/O failure while reading or writing a value.
    #[error("I/O error on key {key}")]
    Io { key: String, source: io::Error },

    /// Represents a value that isn't valid UTF-8.
    #[error("Value under key {key} is not UTF-8")]
    NotUtf8 { key: String },
}

/// Enumerates errors returned by the persistence adapter.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Represents an error returned by the underlying backend.
    #[error("Backend error")]
    Store {
        #[from]
        source: StoreError,
    },

    /// Represents a collection that couldn't be serialized.
    #[error("Serialization error")]
    Serialize { source: serde_json::Error },

    /// Represents stored data that couldn't be deserialized.
    #[error("Stored records are corrupt")]
    Corrupt { source: serde_json::Error },

    /// Represents a save refused because the stored value could not be
    /// read or backed up, so writing would destroy it.
    #[error("Stored records could not be read; refusing to overwrite them")]
    ReadOnly,
}

/// Enumerates problems found while validating an entry form.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("name is required")]
    NameRequired,

    #[error("powder amount is required and must be greater than 0")]
    PowderRequired,

    #[error("{field} must be a number")]
    InvalidNumber { field: &'static str },

    #[error("{field} must be greater than 0")]
    NotPositive { field: &'static str },

    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    #[error("{field} must be between 1 and 5, not {value}")]
    RatingOutOfRange { field: &'static str, value: u8 },

    #[error("at most {max} drink photos are allowed, not {count}")]
    TooManyPhotos { count: usize, max: usize },
}

/// Joins validation messages into a single line.
pub fn summarize_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
