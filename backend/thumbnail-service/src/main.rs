//! Thumbnail Service - AWS Lambda function
//!
//! Environment variables:
//! - REGION: AWS region of the buckets (falls back to AWS_REGION)
//! - OUTBOX_BUCKET: destination bucket for thumbnails (required)
//! - INBOX_BUCKET: only accept events from this bucket (optional)
//! - IMAGE_SIZE_LIMIT: max source object size in bytes (default: 2097152)
//! - THUMBNAIL_WIDTH / THUMBNAIL_HEIGHT: output size (default: 200x200)
//! - THUMBNAIL_UPSCALE: scale up images smaller than the target (default: true)
//! - THUMBNAIL_FORMAT: jpeg, png or tiff (default: source format)
//! - THUMBNAIL_JPEG_QUALITY: 1-100 (default: 85)
//! - THUMBNAIL_IMAGE_EXTENSIONS: comma separated key suffixes (default: jpg,jpeg,png,tif,tiff)

use lambda_runtime::{run, service_fn, Error};
use std::sync::Arc;
use thumbnail_service::handler::function_handler;
use thumbnail_service::services::thumbnail::{S3ObjectStore, ThumbnailService};
use thumbnail_service::ServiceConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("thumbnail_service=info")),
        )
        .init();

    // Missing configuration must stop the function before any invocation
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    info!(
        region = %config.region,
        inbox_bucket = ?config.expected_source_bucket,
        outbox_bucket = %config.destination_bucket,
        width = config.thumbnail.width,
        height = config.thumbnail.height,
        size_limit = config.max_input_byte_size,
        "Configuration loaded"
    );

    let store = S3ObjectStore::from_region(&config.region).await;
    let service = ThumbnailService::new(Arc::new(store), Arc::new(config));

    run(service_fn(|event| function_handler(event, &service))).await
}
