//! Terms count requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::coordinator::TermsCountAction;
use crate::action::response::TermsCountResponse;
use crate::error::Result;

/// How shards owned by the coordinating node are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationThreading {
    /// Run local shards on the calling thread.
    NoThreads,

    /// Run all local shards one after another on a single worker.
    SingleThread,

    /// Run each local shard on its own worker task.
    #[default]
    ThreadPerShard,
}

/// A request to count the terms of one or more indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsCountRequest {
    /// Target indices. Empty means all indices.
    pub indices: Vec<String>,

    /// Only count terms of this field.
    pub field: Option<String>,

    /// Overrides the configured operation threading.
    pub operation_threading: Option<OperationThreading>,

    /// Overrides the configured timeout.
    pub timeout: Option<Duration>,
}

impl TermsCountRequest {
    /// Create a request against the given indices.
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indices: indices.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Create a request against all indices.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only count terms of `field`.
    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the operation threading.
    pub fn with_operation_threading(mut self, threading: OperationThreading) -> Self {
        self.operation_threading = Some(threading);
        self
    }

    /// Set the timeout for the whole request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Builds a request and executes it on an action.
pub struct TermsCountRequestBuilder<'a> {
    action: &'a TermsCountAction,
    request: TermsCountRequest,
}

impl<'a> TermsCountRequestBuilder<'a> {
    pub fn new(action: &'a TermsCountAction) -> Self {
        Self {
            action,
            request: TermsCountRequest::default(),
        }
    }

    pub fn set_indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.indices = indices.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_field<S: Into<String>>(mut self, field: S) -> Self {
        self.request.field = Some(field.into());
        self
    }

    pub fn set_operation_threading(mut self, threading: OperationThreading) -> Self {
        self.request.operation_threading = Some(threading);
        self
    }

    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    pub fn request(&self) -> &TermsCountRequest {
        &self.request
    }

    pub fn execute(self) -> Result<TermsCountResponse> {
        self.action.execute(&self.request)
    }
}
