//! Configuration for terms count execution.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::action::request::OperationThreading;
use crate::error::{Result, TermsCountError};
use crate::shard::aggregator::RESERVED_FIELD_PREFIX;

/// Configuration for the terms count action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermsCountConfig {
    /// Thread pool size for shard operations.
    /// If None, uses the number of CPU cores.
    pub thread_pool_size: Option<usize>,

    /// Threading used for local shards when the request does not say.
    pub default_operation_threading: OperationThreading,

    /// Timeout for a whole request when the request does not set one.
    /// If None, requests wait until every shard has answered.
    pub default_timeout: Option<Duration>,

    /// How long to wait for a remote node's reply.
    pub transport_timeout: Duration,

    /// Fields starting with this character are never counted.
    pub reserved_field_prefix: char,

    /// Whether to enable metrics collection.
    pub enable_metrics: bool,
}

impl Default for TermsCountConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: None,
            default_operation_threading: OperationThreading::ThreadPerShard,
            default_timeout: None,
            transport_timeout: Duration::from_secs(30),
            reserved_field_prefix: RESERVED_FIELD_PREFIX,
            enable_metrics: true,
        }
    }
}

impl TermsCountConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.thread_pool_size == Some(0) {
            return Err(TermsCountError::invalid_config(
                "thread_pool_size must be greater than zero",
            ));
        }
        if self.transport_timeout.is_zero() {
            return Err(TermsCountError::invalid_config(
                "transport_timeout must be greater than zero",
            ));
        }
        if self.reserved_field_prefix.is_whitespace() {
            return Err(TermsCountError::invalid_config(
                "reserved_field_prefix must not be whitespace",
            ));
        }
        Ok(())
    }

    /// Effective thread pool size.
    pub fn pool_size(&self) -> usize {
        self.thread_pool_size.unwrap_or_else(num_cpus::get)
    }

    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn with_operation_threading(mut self, threading: OperationThreading) -> Self {
        self.default_operation_threading = threading;
        self
    }
}
