//! Shared clickstream transform primitives.
//!
//! This crate owns the deterministic parts of the raw-to-processed step: the
//! notification contract, object key mapping, gzip decoding and the per-record
//! transform. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod clock;
pub mod codec;
pub mod contract;
pub mod records;
pub mod storage_keys;

pub use codec::TransformError;
