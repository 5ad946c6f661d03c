//! End-to-end tests for the thumbnail pipeline
//!
//! The service is driven through an in-memory object store that records every
//! read and write, so no AWS account is needed.

use async_trait::async_trait;
use aws_lambda_events::event::s3::S3Event;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use thumbnail_service::error::StorageError;
use lambda_runtime::{Context, LambdaEvent};
use thumbnail_service::handler::{function_handler, handle_event};
use thumbnail_service::models::ChangeNotification;
use thumbnail_service::services::thumbnail::{
    ObjectStore, RecordOutcome, SkipReason, ThumbnailConfig, ThumbnailService,
};
use thumbnail_service::{AppError, ServiceConfig};

#[derive(Default)]
struct InMemoryStore {
    objects: Mutex<HashMap<(String, String), (Bytes, String)>>,
    reads: Mutex<Vec<(String, String)>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl InMemoryStore {
    fn with_object(self, bucket: &str, key: &str, data: Vec<u8>) -> Self {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (Bytes::from(data), "application/octet-stream".to_string()),
        );
        self
    }

    fn object(&self, bucket: &str, key: &str) -> Option<(Bytes, String)> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn reads(&self) -> Vec<(String, String)> {
        self.reads.lock().unwrap().clone()
    }

    fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        max_bytes: u64,
    ) -> Result<Bytes, StorageError> {
        self.reads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        let (data, _) = self.object(bucket, key).ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        if data.len() as u64 > max_bytes {
            return Err(StorageError::TooLarge {
                bucket: bucket.to_string(),
                key: key.to_string(),
                limit: max_bytes,
            });
        }
        Ok(data)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.writes
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (body, content_type.to_string()),
        );
        Ok(())
    }
}

fn config() -> ServiceConfig {
    ServiceConfig {
        region: "us-east-1".to_string(),
        expected_source_bucket: Some("inbox".to_string()),
        destination_bucket: "outbox".to_string(),
        max_input_byte_size: 2 * 1024 * 1024,
        image_extensions: ["jpg", "jpeg", "png", "tif", "tiff"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        thumbnail: ThumbnailConfig::default(),
    }
}

fn image_bytes(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

fn service(store: Arc<InMemoryStore>, config: ServiceConfig) -> ThumbnailService {
    ThumbnailService::new(store, Arc::new(config))
}

fn s3_event(records: &[(&str, &str, i64)]) -> S3Event {
    let records: Vec<serde_json::Value> = records
        .iter()
        .map(|(bucket, key, size)| {
            serde_json::json!({
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "us-east-1",
                "eventTime": "2024-01-01T00:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": { "principalId": "EXAMPLE" },
                "requestParameters": { "sourceIPAddress": "127.0.0.1" },
                "responseElements": {
                    "x-amz-request-id": "EXAMPLE123456789",
                    "x-amz-id-2": "EXAMPLE123/abcdefghijklmno"
                },
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "thumbnailer",
                    "bucket": {
                        "name": bucket,
                        "ownerIdentity": { "principalId": "EXAMPLE" },
                        "arn": format!("arn:aws:s3:::{bucket}")
                    },
                    "object": {
                        "key": key,
                        "size": size,
                        "eTag": "0123456789abcdef0123456789abcdef",
                        "sequencer": "0A1B2C3D4E5F678901"
                    }
                }
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({ "Records": records })).unwrap()
}

fn body_json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_landscape_image_becomes_exact_thumbnail() {
    let store = Arc::new(InMemoryStore::default().with_object(
        "inbox",
        "a.jpg",
        image_bytes(400, 300, ImageOutputFormat::Jpeg(90)),
    ));
    let svc = service(store.clone(), config());

    let outcome = svc
        .process(&ChangeNotification::new("inbox", "a.jpg"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        RecordOutcome::Written { width: 200, height: 200, .. }
    ));
    assert_eq!(store.writes(), vec![("outbox".to_string(), "a.jpg".to_string())]);

    let (data, content_type) = store.object("outbox", "a.jpg").unwrap();
    assert_eq!(content_type, "image/jpeg");
    let thumb = image::load_from_memory(&data).unwrap();
    assert_eq!(thumb.dimensions(), (200, 200));
}

#[tokio::test]
async fn test_destination_bucket_event_rejected_without_read() {
    let store = Arc::new(InMemoryStore::default().with_object(
        "outbox",
        "a.jpg",
        image_bytes(10, 10, ImageOutputFormat::Png),
    ));
    let mut cfg = config();
    cfg.expected_source_bucket = None;
    let svc = service(store.clone(), cfg);

    let outcome = handle_event(&s3_event(&[("outbox", "a.jpg", 100)]), &svc).await;

    assert_eq!(outcome.status_code, 500);
    let body = body_json(&outcome.body);
    assert!(body["error"].as_str().unwrap().contains("recursive"));
    assert!(store.reads().is_empty());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_non_image_skipped_with_empty_body() {
    let store = Arc::new(InMemoryStore::default().with_object(
        "inbox",
        "readme.txt",
        b"hello".to_vec(),
    ));
    let svc = service(store.clone(), config());

    let outcome = handle_event(&s3_event(&[("inbox", "readme.txt", 5)]), &svc).await;

    assert_eq!(outcome.status_code, 200);
    assert_eq!(outcome.body, "{}");
    assert!(store.reads().is_empty());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_corrupt_image_fails_without_write() {
    let store = Arc::new(InMemoryStore::default().with_object(
        "inbox",
        "broken.png",
        b"\x89PNG\r\n\x1a\nnot really a png".to_vec(),
    ));
    let svc = service(store.clone(), config());

    let err = svc
        .process(&ChangeNotification::new("inbox", "broken.png"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Thumbnail(thumbnail_service::error::ThumbnailError::Decode(_))
    ));

    let outcome = handle_event(&s3_event(&[("inbox", "broken.png", 24)]), &svc).await;
    assert_eq!(outcome.status_code, 500);
    let body = body_json(&outcome.body);
    assert!(body["error"].as_str().unwrap().contains("decode"));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_unexpected_source_bucket_rejected() {
    let store = Arc::new(InMemoryStore::default());
    let svc = service(store.clone(), config());

    let outcome = handle_event(&s3_event(&[("elsewhere", "a.jpg", 100)]), &svc).await;

    assert_eq!(outcome.status_code, 500);
    assert!(store.reads().is_empty());
}

#[tokio::test]
async fn test_missing_key_rejected() {
    let store = Arc::new(InMemoryStore::default());
    let svc = service(store.clone(), config());

    let err = svc
        .process(&ChangeNotification::new("inbox", ""))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Invalid S3 event: missing object key");
    assert!(store.reads().is_empty());
}

#[tokio::test]
async fn test_missing_object_is_storage_failure() {
    let store = Arc::new(InMemoryStore::default());
    let svc = service(store.clone(), config());

    let outcome = handle_event(&s3_event(&[("inbox", "gone.png", 100)]), &svc).await;

    assert_eq!(outcome.status_code, 500);
    let body = body_json(&outcome.body);
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert_eq!(store.reads().len(), 1);
}

#[tokio::test]
async fn test_size_limit_enforced() {
    let data = image_bytes(64, 64, ImageOutputFormat::Png);
    let announced = data.len() as i64;
    let store = Arc::new(InMemoryStore::default().with_object("inbox", "big.png", data));
    let mut cfg = config();
    cfg.max_input_byte_size = 16;
    let svc = service(store.clone(), cfg);

    // announced size over the limit: rejected before reading
    let outcome = handle_event(&s3_event(&[("inbox", "big.png", announced)]), &svc).await;
    assert_eq!(outcome.status_code, 500);
    assert!(store.reads().is_empty());

    // size unknown: the read itself stops at the ceiling
    let err = svc
        .process(&ChangeNotification::new("inbox", "big.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(StorageError::TooLarge { .. })));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_empty_object_skipped() {
    let store = Arc::new(InMemoryStore::default().with_object("inbox", "empty.png", Vec::new()));
    let svc = service(store.clone(), config());

    let outcome = svc
        .process(&ChangeNotification::new("inbox", "empty.png"))
        .await
        .unwrap();
    assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::EmptyObject));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_url_encoded_key_is_decoded() {
    let store = Arc::new(InMemoryStore::default().with_object(
        "inbox",
        "holiday photos/beach 1.png",
        image_bytes(300, 500, ImageOutputFormat::Png),
    ));
    let svc = service(store.clone(), config());

    let outcome = handle_event(
        &s3_event(&[("inbox", "holiday+photos/beach%201.png", 1000)]),
        &svc,
    )
    .await;

    assert_eq!(outcome.status_code, 200, "{}", outcome.body);
    let (data, content_type) = store.object("outbox", "holiday photos/beach 1.png").unwrap();
    assert_eq!(content_type, "image/png");
    assert_eq!(image::load_from_memory(&data).unwrap().dimensions(), (200, 200));
}

#[tokio::test]
async fn test_every_record_processed_and_failures_listed() {
    let store = Arc::new(
        InMemoryStore::default()
            .with_object("inbox", "one.png", image_bytes(100, 100, ImageOutputFormat::Png))
            .with_object("inbox", "broken.jpg", b"garbage".to_vec())
            .with_object("inbox", "two.png", image_bytes(800, 200, ImageOutputFormat::Png)),
    );
    let svc = service(store.clone(), config());

    let event = s3_event(&[
        ("inbox", "one.png", 100),
        ("inbox", "notes.md", 10),
        ("inbox", "broken.jpg", 7),
        ("inbox", "two.png", 100),
    ]);
    let outcome = handle_event(&event, &svc).await;

    assert_eq!(outcome.status_code, 500);
    let body = body_json(&outcome.body);
    assert_eq!(body["error"], "1 of 4 records failed");
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["key"], "broken.jpg");

    let mut written: Vec<String> = store.writes().into_iter().map(|(_, key)| key).collect();
    written.sort();
    assert_eq!(written, vec!["one.png".to_string(), "two.png".to_string()]);
}

#[tokio::test]
async fn test_empty_event_is_failure() {
    let store = Arc::new(InMemoryStore::default());
    let svc = service(store, config());

    let outcome = handle_event(&s3_event(&[]), &svc).await;
    assert_eq!(outcome.status_code, 500);
}

#[tokio::test]
async fn test_reprocessing_is_byte_identical() {
    let store = Arc::new(InMemoryStore::default().with_object(
        "inbox",
        "same.png",
        image_bytes(333, 777, ImageOutputFormat::Png),
    ));
    let svc = service(store.clone(), config());
    let notification = ChangeNotification::new("inbox", "same.png");

    svc.process(&notification).await.unwrap();
    let (first, _) = store.object("outbox", "same.png").unwrap();
    svc.process(&notification).await.unwrap();
    let (second, _) = store.object("outbox", "same.png").unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_function_handler_returns_service_outcome() {
    let store = Arc::new(
        InMemoryStore::default()
            .with_object("inbox", "ok.png", image_bytes(64, 48, ImageOutputFormat::Png))
            .with_object("inbox", "bad.png", b"not an image".to_vec()),
    );
    let svc = service(store.clone(), config());

    let event = LambdaEvent::new(
        s3_event(&[("inbox", "ok.png", 1024), ("inbox", "bad.png", 12)]),
        Context::default(),
    );
    let outcome = function_handler(event, &svc).await.unwrap();

    assert_eq!(outcome.status_code, 500);
    let body = body_json(&outcome.body);
    assert_eq!(body["error"], "1 of 2 records failed");
    assert_eq!(body["failures"][0]["key"], "bad.png");
    assert_eq!(store.writes(), vec![("outbox".to_string(), "ok.png".to_string())]);

    let event = LambdaEvent::new(s3_event(&[("inbox", "ok.png", 1024)]), Context::default());
    let outcome = function_handler(event, &svc).await.unwrap();
    assert_eq!(outcome.status_code, 200);
    assert_eq!(outcome.body, "{}");
}
