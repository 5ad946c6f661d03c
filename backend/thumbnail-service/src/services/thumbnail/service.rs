//! Thumbnail service - coordinates validation, storage, and thumbnail generation
//!
//! For every notification:
//! 1. Classify it (proceed, skip, or reject)
//! 2. Read the source object with a size ceiling
//! 3. Generate the thumbnail
//! 4. Write it to the destination bucket under the same key
//!
//! Failures are terminal for the record; nothing is retried here.

use super::processor::ThumbnailProcessor;
use super::storage::ObjectStore;
use super::validator::{classify, Classification, SkipReason};
use crate::config::ServiceConfig;
use crate::error::{Result, ValidationError};
use crate::models::{ChangeNotification, Outcome, RecordFailure};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Written {
        bucket: String,
        key: String,
        size: usize,
        width: u32,
        height: u32,
    },
    Skipped(SkipReason),
}

/// Thumbnail service for processing storage-change notifications
pub struct ThumbnailService {
    store: Arc<dyn ObjectStore>,
    processor: Arc<ThumbnailProcessor>,
    config: Arc<ServiceConfig>,
}

impl ThumbnailService {
    /// Create a new thumbnail service
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<ServiceConfig>) -> Self {
        let processor = Arc::new(ThumbnailProcessor::new(config.thumbnail.clone()));
        Self {
            store,
            processor,
            config,
        }
    }

    /// Process a single notification end to end
    pub async fn process(&self, notification: &ChangeNotification) -> Result<RecordOutcome> {
        let bucket = notification.source_bucket.as_str();
        let key = notification.object_key.as_str();

        match classify(notification, &self.config) {
            Classification::Eligible => {}
            Classification::Skip(reason) => {
                info!(bucket = %bucket, key = %key, reason = %reason, "Object ignored");
                return Ok(RecordOutcome::Skipped(reason));
            }
            Classification::Reject(err) => return Err(err.into()),
        }

        let original = self
            .store
            .get_object(bucket, key, self.config.max_input_byte_size)
            .await?;
        if original.is_empty() {
            info!(bucket = %bucket, key = %key, "Object is empty, ignored");
            return Ok(RecordOutcome::Skipped(SkipReason::EmptyObject));
        }

        info!(bucket = %bucket, key = %key, size = original.len(), "Processing image");
        let thumbnail = self.processor.clone().generate_async(original).await?;

        let destination = self.config.destination_bucket.as_str();
        let size = thumbnail.data.len();
        self.store
            .put_object(destination, key, thumbnail.data.clone(), thumbnail.content_type())
            .await?;

        info!(
            bucket = %destination,
            key = %key,
            width = thumbnail.width,
            height = thumbnail.height,
            size = size,
            resized = thumbnail.resized,
            "Thumbnail created successfully"
        );

        Ok(RecordOutcome::Written {
            bucket: destination.to_string(),
            key: key.to_string(),
            size,
            width: thumbnail.width,
            height: thumbnail.height,
        })
    }

    /// Process every notification independently and fold the results into one outcome
    pub async fn process_all(&self, notifications: &[ChangeNotification]) -> Outcome {
        if notifications.is_empty() {
            let err = ValidationError::EmptyEvent;
            warn!(error = %err, "Nothing to process");
            return Outcome::error(err.to_string());
        }

        let mut failures = Vec::new();
        for notification in notifications {
            if let Err(e) = self.process(notification).await {
                error!(
                    bucket = %notification.source_bucket,
                    key = %notification.object_key,
                    error = %e,
                    "Failed to generate thumbnail"
                );
                failures.push(RecordFailure {
                    bucket: notification.source_bucket.clone(),
                    key: notification.object_key.clone(),
                    error: e.to_string(),
                });
            }
        }

        match failures.len() {
            0 => Outcome::ok(),
            1 if notifications.len() == 1 => Outcome::failures(failures[0].error.clone(), &failures),
            n => Outcome::failures(
                format!("{n} of {} records failed", notifications.len()),
                &failures,
            ),
        }
    }
}
