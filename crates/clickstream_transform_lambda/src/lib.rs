//! AWS-oriented adapters and handlers for the clickstream transform step.
//!
//! This crate owns runtime integration details (the Lambda handler, storage
//! adapters and environment configuration) and exposes a single runtime module
//! boundary for contract, key mapping and record transform primitives.

pub mod adapters;
pub mod config;
pub mod handlers;

pub mod runtime {
    pub use clickstream_transform_core::{clock, codec, contract, records, storage_keys};
}
