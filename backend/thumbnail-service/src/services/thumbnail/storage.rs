//! Object storage access for the thumbnail pipeline
//!
//! `ObjectStore` is the seam between the pipeline and S3 so the service can be
//! driven by an in-memory store in tests.

use crate::error::StorageError;
use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object into memory, failing once it exceeds `max_bytes`.
    async fn get_object(&self, bucket: &str, key: &str, max_bytes: u64)
        -> Result<Bytes, StorageError>;

    /// Write an object, replacing any existing one.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Accumulates body chunks up to a fixed ceiling
#[derive(Debug)]
pub struct BoundedBuffer {
    buf: BytesMut,
    limit: u64,
}

impl BoundedBuffer {
    pub fn new(limit: u64) -> Self {
        Self {
            buf: BytesMut::new(),
            limit,
        }
    }

    /// Append a chunk; returns false (and keeps nothing new) if the ceiling would be crossed
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        if self.buf.len() as u64 + chunk.len() as u64 > self.limit {
            return false;
        }
        self.buf.extend_from_slice(chunk);
        true
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// S3-backed object store
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Arc<Client>,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Build a client from the default credential chain for the given region
    pub async fn from_region(region: &str) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Client::new(&aws_config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        max_bytes: u64,
    ) -> Result<Bytes, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, key))?;

        info!(
            bucket = %bucket,
            key = %key,
            content_length = ?response.content_length(),
            content_type = ?response.content_type(),
            e_tag = ?response.e_tag(),
            "GetObject"
        );

        if response.delete_marker() == Some(true) {
            return Err(StorageError::DeleteMarker {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        let too_large = || StorageError::TooLarge {
            bucket: bucket.to_string(),
            key: key.to_string(),
            limit: max_bytes,
        };

        if let Some(length) = response.content_length() {
            if length > 0 && length as u64 > max_bytes {
                return Err(too_large());
            }
        }

        let mut body: ByteStream = response.body;
        let mut buffer = BoundedBuffer::new(max_bytes);
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::Other(format!("Failed to read {bucket}/{key}: {e}")))?
        {
            if !buffer.push(&chunk) {
                return Err(too_large());
            }
        }

        debug!(bucket = %bucket, key = %key, size = buffer.size(), "Object read into memory");
        Ok(buffer.freeze())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = body.len();
        let response = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, key))?;

        info!(
            bucket = %bucket,
            key = %key,
            size = size,
            e_tag = ?response.e_tag(),
            "PutObject"
        );

        Ok(())
    }
}

fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, bucket: &str, key: &str) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let raw = err.raw_response();
    // S3 answers a GET on a delete marker with 404 plus this header
    if raw.and_then(|r| r.headers().get("x-amz-delete-marker")) == Some("true") {
        return StorageError::DeleteMarker {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
    }

    let status = raw.map(|r| r.status().as_u16());
    match (err.code(), status) {
        (Some("NoSuchKey" | "NotFound" | "NoSuchBucket"), _) | (_, Some(404)) => {
            StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        }
        (Some("AccessDenied"), _) | (_, Some(403)) => StorageError::AccessDenied {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        _ => StorageError::Other(DisplayErrorContext(&err).to_string()),
    }
}
