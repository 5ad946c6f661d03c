//! Thumbnail generation service
//!
//! This module provides thumbnail generation capabilities:
//! - Validator for deciding whether a change notification is processed
//! - Image processor for cover-resizing and center-cropping
//! - Object store abstraction with an S3 implementation
//! - Service for coordinating thumbnail generation

pub mod processor;
pub mod service;
pub mod storage;
pub mod validator;

pub use processor::{
    CoverGeometry, SourceCrop, ThumbnailConfig, ThumbnailProcessor, ThumbnailResult,
};
pub use service::{RecordOutcome, ThumbnailService};
pub use storage::{BoundedBuffer, ObjectStore, S3ObjectStore};
pub use validator::{classify, Classification, SkipReason};
