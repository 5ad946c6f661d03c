/// Data models for thumbnail-service
use aws_lambda_events::event::s3::S3EventRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One storage-change notification, taken from a single S3 event record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub source_bucket: String,
    /// URL-decoded object key
    pub object_key: String,
    /// Size announced by the event, if any
    pub object_size: Option<u64>,
}

impl ChangeNotification {
    pub fn new(source_bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            object_key: object_key.into(),
            object_size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.object_size = Some(size);
        self
    }

    /// Build a notification from an S3 event record.
    ///
    /// Absent fields become empty strings so the validator can report them.
    pub fn from_record(record: &S3EventRecord) -> Self {
        let source_bucket = record.s3.bucket.name.clone().unwrap_or_default();
        let object_key = record
            .s3
            .object
            .key
            .as_deref()
            .map(decode_object_key)
            .unwrap_or_default();

        let notification = Self::new(source_bucket, object_key);
        match record.s3.object.size.and_then(|size| u64::try_from(size).ok()) {
            Some(size) => notification.with_size(size),
            None => notification,
        }
    }

    pub fn source_bucket_is_destination(&self, destination_bucket: &str) -> bool {
        self.source_bucket == destination_bucket
    }
}

/// S3 encodes keys in notifications form-style: `+` is a space.
fn decode_object_key(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => plus_decoded,
    }
}

/// A record that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub bucket: String,
    pub key: String,
    pub error: String,
}

/// Result returned to the invoking infrastructure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub status_code: u16,
    pub body: String,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: json!({}).to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: json!({ "error": message.into() }).to_string(),
        }
    }

    /// 500 outcome listing each failed record
    pub fn failures(summary: impl Into<String>, failures: &[RecordFailure]) -> Self {
        Self {
            status_code: 500,
            body: json!({ "error": summary.into(), "failures": failures }).to_string(),
        }
    }
}
