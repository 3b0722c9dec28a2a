use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::adapters::object_store::ObjectStore;
use crate::config::{HandlerConfig, NotificationFailurePolicy};
use crate::runtime::clock::Clock;
use crate::runtime::codec::{decompress_gzip, encode_json_lines, TransformError};
use crate::runtime::contract::{
    HandlerStatus, ObjectCreatedEvent, ObjectNotification, PROCESSED_CONTENT_TYPE,
};
use crate::runtime::records::{transform_document, TransformSummary};
use crate::runtime::storage_keys::decode_object_key;

#[derive(Debug, Error)]
pub enum TransformHandlerError {
    #[error("invalid object created event: {0}")]
    InvalidEvent(String),
    #[error("failed to read s3://{bucket}/{key}: {message}")]
    Read {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("failed to decode s3://{bucket}/{key}: {source}")]
    Decode {
        bucket: String,
        key: String,
        #[source]
        source: TransformError,
    },
    #[error("failed to write s3://{bucket}/{key}: {message}")]
    Write {
        bucket: String,
        key: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Written {
        destination_key: String,
        summary: TransformSummary,
    },
    /// Nothing survived the transform, so no processed object was created.
    SkippedEmpty { summary: TransformSummary },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BatchCounts {
    written: usize,
    skipped_empty: usize,
    failed: usize,
}

/// Parses a raw Lambda payload and runs the batch.
pub fn handle_event_value(
    payload: serde_json::Value,
    config: &HandlerConfig,
    store: &impl ObjectStore,
    clock: &impl Clock,
) -> Result<HandlerStatus, TransformHandlerError> {
    let event: ObjectCreatedEvent = serde_json::from_value(payload)
        .map_err(|error| TransformHandlerError::InvalidEvent(error.to_string()))?;
    handle_object_created_event(&event, config, store, clock)
}

/// Processes notifications strictly in array order.
///
/// A record that is not a valid S3 notification fails only its own slot.
/// Under [`NotificationFailurePolicy::AbortBatch`] the first failing
/// notification ends the batch and its error is returned; notifications after
/// it are never read. The acknowledgment does not report per-notification
/// results.
pub fn handle_object_created_event(
    event: &ObjectCreatedEvent,
    config: &HandlerConfig,
    store: &impl ObjectStore,
    clock: &impl Clock,
) -> Result<HandlerStatus, TransformHandlerError> {
    let started_at = Instant::now();
    let notifications = event.notifications();
    let mut counts = BatchCounts::default();

    for (index, notification) in notifications.iter().enumerate() {
        let result = match notification {
            Ok(notification) => handle_notification(notification, config, store, clock),
            Err(invalid) => Err(TransformHandlerError::InvalidEvent(invalid.to_string())),
        };

        match result {
            Ok(NotificationOutcome::Written { .. }) => counts.written += 1,
            Ok(NotificationOutcome::SkippedEmpty { .. }) => counts.skipped_empty += 1,
            Err(failure) => {
                counts.failed += 1;
                error!(
                    record_index = index,
                    policy = config.failure_policy.as_str(),
                    error = %failure,
                    "notification_failed"
                );
                if config.failure_policy == NotificationFailurePolicy::AbortBatch {
                    return Err(failure);
                }
            }
        }
    }

    info!(
        notifications = notifications.len(),
        written = counts.written,
        skipped_empty = counts.skipped_empty,
        failed = counts.failed,
        duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
        "batch_completed"
    );

    Ok(HandlerStatus::ok())
}

pub fn handle_notification(
    notification: &ObjectNotification,
    config: &HandlerConfig,
    store: &impl ObjectStore,
    clock: &impl Clock,
) -> Result<NotificationOutcome, TransformHandlerError> {
    let bucket = notification.bucket.as_str();
    let source_key = decode_object_key(&notification.key);
    info!(bucket, source_key = %source_key, "notification_started");

    let raw_body = store
        .get_object(bucket, &source_key)
        .map_err(|message| TransformHandlerError::Read {
            bucket: bucket.to_string(),
            key: source_key.clone(),
            message,
        })?;

    let text = decompress_gzip(&raw_body).map_err(|source| TransformHandlerError::Decode {
        bucket: bucket.to_string(),
        key: source_key.clone(),
        source,
    })?;

    let document = transform_document(&text, clock);
    let summary = document.summary;
    if summary.lines_dropped() > 0 {
        debug!(
            bucket,
            source_key = %source_key,
            malformed_lines = summary.malformed_lines,
            non_object_lines = summary.non_object_lines,
            "lines_dropped"
        );
    }

    if document.is_empty() {
        info!(
            bucket,
            source_key = %source_key,
            blank_lines = summary.blank_lines,
            lines_dropped = summary.lines_dropped(),
            "notification_skipped_empty"
        );
        return Ok(NotificationOutcome::SkippedEmpty { summary });
    }

    let destination_key = config.key_mapping.destination_key(&source_key);
    let body = encode_json_lines(&document.lines);

    store
        .put_object(bucket, &destination_key, &body, PROCESSED_CONTENT_TYPE)
        .map_err(|message| TransformHandlerError::Write {
            bucket: bucket.to_string(),
            key: destination_key.clone(),
            message,
        })?;

    info!(
        bucket,
        source_key = %source_key,
        destination_key = %destination_key,
        records_kept = summary.records_kept,
        lines_dropped = summary.lines_dropped(),
        bytes_written = body.len(),
        "notification_completed"
    );

    Ok(NotificationOutcome::Written {
        destination_key,
        summary,
    })
}
