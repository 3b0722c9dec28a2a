use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const PROCESSED_CONTENT_TYPE: &str = "application/json";
pub const REMOVED_FIELD: &str = "user_id";
pub const TIMESTAMP_FIELD: &str = "processed_ts";
pub const STATUS_OK: &str = "ok";

/// S3 `ObjectCreated` notification payload as delivered to the handler.
///
/// Records stay as raw JSON until their turn in the batch, so one record
/// without a bucket name or object key does not reject its neighbours.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectCreatedEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<Value>,
}

/// The subset of an S3 event record the handler reads; every other event
/// field is accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Object {
    pub key: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("record {index} is not an s3 object notification: {message}")]
pub struct InvalidNotification {
    pub index: usize,
    pub message: String,
}

/// One storage change to process. `key` is still percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNotification {
    pub bucket: String,
    pub key: String,
}

impl ObjectNotification {
    pub fn from_record(index: usize, record: &Value) -> Result<Self, InvalidNotification> {
        let record = NotificationRecord::deserialize(record).map_err(|error| {
            InvalidNotification {
                index,
                message: error.to_string(),
            }
        })?;

        Ok(Self {
            bucket: record.s3.bucket.name,
            key: record.s3.object.key,
        })
    }
}

impl ObjectCreatedEvent {
    /// One entry per record, in array order.
    pub fn notifications(&self) -> Vec<Result<ObjectNotification, InvalidNotification>> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| ObjectNotification::from_record(index, record))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerStatus {
    pub status: String,
}

impl HandlerStatus {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
        }
    }
}
