//! Scatter-gather execution of terms count requests.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::action::TERMS_COUNT_ACTION;
use crate::action::config::TermsCountConfig;
use crate::action::merger::ShardResultsMerger;
use crate::action::metrics::{TermsCountMetrics, TermsCountMetricsCollector, Timer};
use crate::action::outcome::{OutcomeSlots, ShardOutcome};
use crate::action::request::{OperationThreading, TermsCountRequest, TermsCountRequestBuilder};
use crate::action::resolver::ShardTargetResolver;
use crate::action::response::TermsCountResponse;
use crate::cluster::{ClusterService, ShardTarget};
use crate::error::{Result, TermsCountError};
use crate::shard::indices::IndicesService;
use crate::transport::channel::ShardChannel;
use crate::transport::message::ShardTermsRequest;

/// Coordinates a terms count across the shards of one or more indices.
///
/// The action runs on one node. Shards whose primary lives on that node are
/// counted through its [`IndicesService`]; all others are sent to their owner
/// through the [`ShardChannel`].
pub struct TermsCountAction {
    /// Configuration for the action.
    config: TermsCountConfig,

    /// Source of cluster state.
    cluster: Arc<dyn ClusterService>,

    /// Shards hosted by the local node.
    indices: Arc<IndicesService>,

    /// Channel to other nodes.
    channel: Arc<dyn ShardChannel>,

    resolver: ShardTargetResolver,
    merger: ShardResultsMerger,

    /// Thread pool for shard operations.
    thread_pool: Arc<ThreadPool>,

    /// Metrics collector.
    metrics: Arc<TermsCountMetricsCollector>,
}

impl TermsCountAction {
    /// Create a new terms count action.
    pub fn new(
        config: TermsCountConfig,
        cluster: Arc<dyn ClusterService>,
        indices: Arc<IndicesService>,
        channel: Arc<dyn ShardChannel>,
    ) -> Result<Self> {
        config.validate()?;
        if indices.node_id() != cluster.local_node_id() {
            return Err(TermsCountError::invalid_config(format!(
                "indices service belongs to node [{}] but the cluster service to [{}]",
                indices.node_id(),
                cluster.local_node_id()
            )));
        }

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(config.pool_size())
            .thread_name(|i| format!("termscount-{i}"))
            .build()
            .map_err(|e| TermsCountError::internal(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            config,
            cluster,
            indices,
            channel,
            resolver: ShardTargetResolver::new(),
            merger: ShardResultsMerger::new(),
            thread_pool: Arc::new(thread_pool),
            metrics: Arc::new(TermsCountMetricsCollector::new()),
        })
    }

    pub fn config(&self) -> &TermsCountConfig {
        &self.config
    }

    pub fn local_node_id(&self) -> &str {
        self.cluster.local_node_id()
    }

    /// Start building a request to execute on this action.
    pub fn prepare_execute(&self) -> TermsCountRequestBuilder<'_> {
        TermsCountRequestBuilder::new(self)
    }

    /// Execute a request and block until every shard has answered.
    ///
    /// Returns an error only when the request is rejected before dispatch or
    /// the timeout expires. Shard-level problems are reported in the
    /// response.
    pub fn execute(&self, request: &TermsCountRequest) -> Result<TermsCountResponse> {
        let timer = Timer::start();
        let result = self.do_execute(request);

        if self.config.enable_metrics {
            match &result {
                Ok(response) => self.metrics.record_response(timer.stop(), response),
                Err(e) => self
                    .metrics
                    .record_failure(timer.stop(), matches!(e, TermsCountError::Timeout(_))),
            }
        }
        result
    }

    /// Execute a request from async code without blocking the runtime.
    pub async fn execute_async(
        self: Arc<Self>,
        request: TermsCountRequest,
    ) -> Result<TermsCountResponse> {
        tokio::task::spawn_blocking(move || self.execute(&request))
            .await
            .map_err(|e| TermsCountError::ThreadJoinError(e.to_string()))?
    }

    fn do_execute(&self, request: &TermsCountRequest) -> Result<TermsCountResponse> {
        let request_id = uuid::Uuid::new_v4();
        let state = self.cluster.state();
        let targets = self
            .resolver
            .resolve(&state, &request.indices)?
            .into_targets();

        let threading = request
            .operation_threading
            .unwrap_or(self.config.default_operation_threading);
        log::debug!(
            "[{request_id}] [{TERMS_COUNT_ACTION}] counting terms on {} shards (field: {:?}, threading: {:?})",
            targets.len(),
            request.field,
            threading
        );

        let slots = Arc::new(OutcomeSlots::new(targets.len()));
        let operation = ShardOperation {
            local_node: self.cluster.local_node_id().to_string(),
            indices: Arc::clone(&self.indices),
            channel: Arc::clone(&self.channel),
            field: request.field.clone(),
            slots: Arc::clone(&slots),
        };

        let (local, remote): (Vec<_>, Vec<_>) = targets
            .into_iter()
            .enumerate()
            .partition(|(_, target)| target.node_id == operation.local_node);

        for (slot, target) in remote {
            let operation = operation.clone();
            self.thread_pool
                .spawn(move || operation.perform(slot, target));
        }

        match threading {
            OperationThreading::ThreadPerShard => {
                for (slot, target) in local {
                    let operation = operation.clone();
                    self.thread_pool
                        .spawn(move || operation.perform(slot, target));
                }
            }
            OperationThreading::SingleThread => {
                if !local.is_empty() {
                    let operation = operation.clone();
                    self.thread_pool.spawn(move || {
                        for (slot, target) in local {
                            operation.perform(slot, target);
                        }
                    });
                }
            }
            OperationThreading::NoThreads => {
                for (slot, target) in local {
                    operation.perform(slot, target);
                }
            }
        }

        match request.timeout.or(self.config.default_timeout) {
            Some(timeout) => {
                if !slots.wait_for(timeout) {
                    slots.cancel();
                    log::warn!(
                        "[{request_id}] timed out after {timeout:?} with {} of {} shards pending",
                        slots.remaining(),
                        slots.len()
                    );
                    return Err(TermsCountError::timeout(format!(
                        "terms count did not complete within {timeout:?}"
                    )));
                }
            }
            None => slots.wait(),
        }

        let response = self.merger.merge(slots.outcomes()?);
        log::debug!(
            "[{request_id}] done: total {}, successful {}, failed {}, {} distinct terms",
            response.total_shards(),
            response.successful_shards(),
            response.failed_shards(),
            response.terms().len()
        );
        Ok(response)
    }

    /// Get current metrics snapshot.
    pub fn metrics(&self) -> TermsCountMetrics {
        self.metrics.snapshot()
    }

    /// Reset metrics.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }
}

/// Everything a worker needs to run one shard and record its outcome.
#[derive(Clone)]
struct ShardOperation {
    local_node: String,
    indices: Arc<IndicesService>,
    channel: Arc<dyn ShardChannel>,
    field: Option<String>,
    slots: Arc<OutcomeSlots>,
}

impl ShardOperation {
    fn perform(&self, slot: usize, target: ShardTarget) {
        if self.slots.is_cancelled() {
            log::trace!("shard {} skipped, request abandoned", target.shard_id);
            return;
        }

        let request = ShardTermsRequest::new(target.shard_id.clone(), self.field.clone());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            if target.node_id == self.local_node {
                self.indices.terms_count(&request)
            } else {
                self.channel.run_on_owner(&target.node_id, request)
            }
        }))
        .unwrap_or_else(|_| {
            Err(TermsCountError::internal(format!(
                "shard operation on {} panicked",
                target.shard_id
            )))
        });

        let outcome = ShardOutcome::from_result(&target.shard_id, result);
        match &outcome {
            ShardOutcome::Success(response) => log::trace!(
                "shard {} on [{}] returned {} terms",
                target.shard_id,
                target.node_id,
                response.terms.len()
            ),
            ShardOutcome::NotServable(shard) => {
                log::debug!("shard {shard} no longer active on [{}]", target.node_id)
            }
            ShardOutcome::Failure(failure) => {
                log::warn!("shard failure on [{}]: {failure}", target.node_id)
            }
        }

        if let Err(e) = self.slots.fill(slot, outcome) {
            log::error!("dropping outcome of shard {}: {e}", target.shard_id);
        }
    }
}
