/// Error types for the thumbnail service
///
/// `ConfigError` is fatal at startup and stops the function before it serves
/// anything. `AppError` is scoped to a single invocation and is turned into a
/// failed `Outcome` by the handler.
use thiserror::Error;

/// Result type for thumbnail-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Startup configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or empty
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is present but its value cannot be used
    #[error("Invalid configuration {name}={value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Reasons a change notification is rejected outright
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The notification lacks a bucket name or an object key
    #[error("Invalid S3 event: missing {0}")]
    MissingField(&'static str),

    /// The event came from a bucket other than the configured source
    #[error("S3 event was sent from {bucket}, which must be {expected}")]
    UnexpectedSourceBucket { bucket: String, expected: String },

    /// The event came from the destination bucket itself
    #[error("S3 event was sent from the destination bucket - {bucket} - itself, which may cause recursive invocations")]
    RecursiveInvocation { bucket: String },

    /// The notification announces an object above the size ceiling
    #[error("Object {key} is {size} bytes, which exceeds the limit of {limit} bytes")]
    ObjectTooLarge { key: String, size: u64, limit: u64 },

    /// The event carries no records at all
    #[error("S3 event contains no records")]
    EmptyEvent,
}

/// Image decode / resize / encode errors
#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to resize image: {0}")]
    Resize(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Decoded fine, but there is no encoder for the format
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// The blocking worker panicked or was cancelled
    #[error("Thumbnail task failed: {0}")]
    TaskFailed(String),
}

/// Object storage errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Access denied: {bucket}/{key}")]
    AccessDenied { bucket: String, key: String },

    #[error("The object {bucket}/{key} is a delete marker")]
    DeleteMarker { bucket: String, key: String },

    /// The body grew past the configured ceiling while reading
    #[error("Object {bucket}/{key} exceeds the limit of {limit} bytes")]
    TooLarge {
        bucket: String,
        key: String,
        limit: u64,
    },

    #[error("Storage error: {0}")]
    Other(String),
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
