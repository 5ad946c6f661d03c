//! Thumbnail Service
//!
//! Turns images uploaded to an S3 bucket into fixed-size thumbnails written
//! to a separate bucket. Runs as an AWS Lambda function behind an S3
//! `ObjectCreated` notification.

pub mod config;
pub mod error;
pub mod handler;
pub mod models;
pub mod services;

// Public re-exports
pub use config::ServiceConfig;
pub use error::{AppError, Result};
