//! Event validator - decides what to do with an incoming change notification
//!
//! Checks run in a fixed order and stop at the first match:
//! 1. missing bucket name or object key -> reject
//! 2. bucket differs from the configured source bucket -> reject
//! 3. bucket is the destination bucket -> reject (loop guard)
//! 4. key has no image extension -> skip
//! 5. announced size is zero -> skip, above the limit -> reject
//! 6. otherwise eligible

use crate::config::ServiceConfig;
use crate::error::ValidationError;
use crate::models::ChangeNotification;
use std::fmt;

/// Why a notification was ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAnImage,
    EmptyObject,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAnImage => write!(f, "not an image file"),
            SkipReason::EmptyObject => write!(f, "empty object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Eligible,
    Skip(SkipReason),
    Reject(ValidationError),
}

/// Classify a notification against the service configuration
pub fn classify(notification: &ChangeNotification, config: &ServiceConfig) -> Classification {
    if notification.source_bucket.is_empty() {
        return Classification::Reject(ValidationError::MissingField("bucket name"));
    }
    if notification.object_key.is_empty() {
        return Classification::Reject(ValidationError::MissingField("object key"));
    }

    if let Some(expected) = &config.expected_source_bucket {
        if &notification.source_bucket != expected {
            return Classification::Reject(ValidationError::UnexpectedSourceBucket {
                bucket: notification.source_bucket.clone(),
                expected: expected.clone(),
            });
        }
    }

    if notification.source_bucket_is_destination(&config.destination_bucket) {
        return Classification::Reject(ValidationError::RecursiveInvocation {
            bucket: notification.source_bucket.clone(),
        });
    }

    if !has_image_extension(&notification.object_key, &config.image_extensions) {
        return Classification::Skip(SkipReason::NotAnImage);
    }

    match notification.object_size {
        Some(0) => Classification::Skip(SkipReason::EmptyObject),
        Some(size) if size > config.max_input_byte_size => {
            Classification::Reject(ValidationError::ObjectTooLarge {
                key: notification.object_key.clone(),
                size,
                limit: config.max_input_byte_size,
            })
        }
        _ => Classification::Eligible,
    }
}

/// Case-insensitive suffix match on the last path segment
pub fn has_image_extension(key: &str, extensions: &[String]) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rsplit_once('.') {
        Some((_, ext)) => extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        None => false,
    }
}
