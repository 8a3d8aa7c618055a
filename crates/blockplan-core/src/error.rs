//! Core error types for blockplan-core.
//!
//! An infeasible slot is never an error: searches return `Option`. Errors
//! here cover the collaborators (task source, calendar store), configuration
//! and user input.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Core error type for blockplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Calendar store errors
    #[error("Calendar store error: {0}")]
    Store(#[from] StoreError),

    /// Task source errors on reads
    #[error("Task source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The task source rejected a write; the local ledger was left untouched.
    #[error("Failed to write task '{task_id}' back to the task source: {source}")]
    ExternalWrite {
        task_id: String,
        #[source]
        source: SourceError,
    },

    /// A slot that was suggested is no longer feasible at commit time.
    #[error("Slot {date} {start} is no longer available")]
    SlotUnavailable {
        date: NaiveDate,
        start: NaiveDateTime,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`crate::integrations::TaskSource`].
#[derive(Error, Debug)]
pub enum SourceError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// No task with this id
    #[error("Task not found: {0}")]
    NotFound(String),

    /// No API token configured
    #[error("No API token configured for {service}")]
    NotAuthenticated { service: String },

    /// Write rejected by the source for another reason
    #[error("{0}")]
    Rejected(String),
}

/// Errors raised by a [`crate::storage::CalendarStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open calendar store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Calendar store is locked")]
    Locked,

    /// A stored payload could not be decoded
    #[error("Corrupt payload for '{key}': {message}")]
    Corrupt { key: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home or data directory unavailable
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time-of-day range
    #[error("Invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange { start: String, end: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Referenced item does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
