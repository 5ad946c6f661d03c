//! Lambda entry point: one S3 event in, one outcome out.
//!
//! Per-record errors are already folded into the outcome by the service, so
//! the only error surfaced to the runtime is one the runtime itself raises.

use crate::models::{ChangeNotification, Outcome};
use crate::services::ThumbnailService;
use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{Error, LambdaEvent};
use tracing::{debug, info, Level};

pub async fn function_handler(
    event: LambdaEvent<S3Event>,
    service: &ThumbnailService,
) -> Result<Outcome, Error> {
    let (payload, context) = event.into_parts();
    info!(
        request_id = %context.request_id,
        records = payload.records.len(),
        "Invocation received"
    );
    if tracing::enabled!(Level::DEBUG) {
        if let Ok(raw) = serde_json::to_string(&payload) {
            debug!(event = %raw, "S3 event payload");
        }
    }

    let outcome = handle_event(&payload, service).await;
    info!(
        request_id = %context.request_id,
        status_code = outcome.status_code,
        "Invocation finished"
    );
    Ok(outcome)
}

/// Convert every record into a notification and process them in order
pub async fn handle_event(event: &S3Event, service: &ThumbnailService) -> Outcome {
    let notifications: Vec<ChangeNotification> = event
        .records
        .iter()
        .map(ChangeNotification::from_record)
        .collect();
    service.process_all(&notifications).await
}
