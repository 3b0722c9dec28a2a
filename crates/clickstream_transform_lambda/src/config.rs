use std::str::FromStr;

use thiserror::Error;

use crate::runtime::storage_keys::{KeyMapping, PROCESSED_PREFIX, RAW_PREFIX};

pub const RAW_PREFIX_ENV: &str = "RAW_PREFIX";
pub const PROCESSED_PREFIX_ENV: &str = "PROCESSED_PREFIX";
pub const FAILURE_POLICY_ENV: &str = "NOTIFICATION_FAILURE_POLICY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be one of `abort_batch` or `skip_notification`, got `{value}`")]
    InvalidFailurePolicy { name: &'static str, value: String },
    #[error("{name} cannot be empty")]
    EmptyPrefix { name: &'static str },
}

/// What happens to the rest of a batch when one notification fails to read,
/// decode or write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotificationFailurePolicy {
    /// Return the first failure; later notifications are not processed.
    #[default]
    AbortBatch,
    /// Log the failure and continue with the next notification.
    SkipNotification,
}

impl NotificationFailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AbortBatch => "abort_batch",
            Self::SkipNotification => "skip_notification",
        }
    }
}

impl FromStr for NotificationFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort_batch" => Ok(Self::AbortBatch),
            "skip_notification" => Ok(Self::SkipNotification),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerConfig {
    pub key_mapping: KeyMapping,
    pub failure_policy: NotificationFailurePolicy,
}

impl HandlerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Unset variables fall back to the `raw/` to `processed/` mapping and
    /// the abort-on-first-failure policy.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_prefix = lookup(RAW_PREFIX_ENV).unwrap_or_else(|| RAW_PREFIX.to_string());
        let processed_prefix =
            lookup(PROCESSED_PREFIX_ENV).unwrap_or_else(|| PROCESSED_PREFIX.to_string());

        if raw_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix {
                name: RAW_PREFIX_ENV,
            });
        }
        if processed_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix {
                name: PROCESSED_PREFIX_ENV,
            });
        }

        let failure_policy = match lookup(FAILURE_POLICY_ENV) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidFailurePolicy {
                    name: FAILURE_POLICY_ENV,
                    value,
                })?,
            None => NotificationFailurePolicy::default(),
        };

        Ok(Self {
            key_mapping: KeyMapping::new(raw_prefix, processed_prefix),
            failure_policy,
        })
    }
}
