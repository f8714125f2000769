// Configuration Module
//
// Configuration for the service layer: lock timing, message sizing, topic
// suffixes, publish options and logging.
//
// ## Examples
//
// ```rust
// use bm_service::config::{LoggingConfig, LogLevel, ServiceConfig};
// use std::time::Duration;
//
// let config = ServiceConfig::new(0x42)
//     .with_lock_timeout(Duration::from_millis(250))
//     .with_logging_config(LoggingConfig::new().with_default_level(LogLevel::Debug));
// ```

use bm_common::config_store::{ConfigError, ConfigStore};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, ServiceError};
use crate::network::{PublishOptions, PUB_SUB_VERSION};
use crate::routing::ServiceTopics;
use crate::services::message::REPLY_HEADER_SIZE;

// Re-export configuration types from bm_common::logging
pub use bm_common::logging::{ComponentKey, LogLevel, LoggingConfig};

/// Default bounded wait for the registry lock
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 100;

/// Default maximum size of a reply message, header included
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024;

/// Config store key overriding the lock timeout (u32, milliseconds)
pub const LOCK_TIMEOUT_KEY: &str = "serviceLockTimeoutMs";

/// Config store key overriding the maximum message size (u32, bytes)
pub const MAX_MESSAGE_SIZE_KEY: &str = "serviceMaxMsgSize";

/// Service layer configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Identity of the local node, used for log context
    pub node_id: u64,

    /// Bounded wait for acquiring the registry lock
    pub lock_timeout: Duration,

    /// Capacity of the reply buffer allocated per dispatch
    pub max_message_size: usize,

    /// Topic suffixes for requests and replies
    pub topics: ServiceTopics,

    /// Options applied to every reply publish
    pub qos: u8,
    pub publish_version: u8,

    /// Logging configuration applied at init (None = leave logging untouched)
    pub logging_config: Option<LoggingConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ServiceConfig {
    pub fn new(node_id: u64) -> Self {
        Self {
            node_id,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            topics: ServiceTopics::default(),
            qos: 0,
            publish_version: PUB_SUB_VERSION,
            logging_config: None,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_request_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.topics.request_suffix = suffix.into();
        self
    }

    pub fn with_reply_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.topics.reply_suffix = suffix.into();
        self
    }

    pub fn with_publish_version(mut self, version: u8) -> Self {
        self.publish_version = version;
        self
    }

    pub fn with_logging_config(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// Overlay values found in a configuration store.
    ///
    /// Missing keys keep the current value; a key holding the wrong type is an error.
    pub fn with_store_overrides(mut self, store: &dyn ConfigStore) -> Result<Self> {
        if let Some(ms) = read_optional_u32(store, LOCK_TIMEOUT_KEY)? {
            self.lock_timeout = Duration::from_millis(u64::from(ms));
        }
        if let Some(size) = read_optional_u32(store, MAX_MESSAGE_SIZE_KEY)? {
            self.max_message_size = size as usize;
        }
        Ok(self)
    }

    /// Largest reply payload a handler may write
    pub fn max_reply_capacity(&self) -> usize {
        self.max_message_size.saturating_sub(REPLY_HEADER_SIZE)
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            qos: self.qos,
            version: self.publish_version,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.topics.request_suffix.is_empty() || self.topics.reply_suffix.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "topic suffixes must not be empty".to_string(),
            ));
        }
        if self.topics.request_suffix == self.topics.reply_suffix {
            return Err(ServiceError::InvalidArgument(
                "request and reply suffixes must differ".to_string(),
            ));
        }
        if self.max_message_size <= REPLY_HEADER_SIZE {
            return Err(ServiceError::InvalidArgument(format!(
                "max message size {} must exceed the reply header size {REPLY_HEADER_SIZE}",
                self.max_message_size
            )));
        }
        Ok(())
    }
}

fn read_optional_u32(store: &dyn ConfigStore, key: &str) -> Result<Option<u32>> {
    match store.get_u32(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::KeyNotFound(_)) => Ok(None),
        Err(e) => Err(ServiceError::InvalidArgument(e.to_string())),
    }
}
