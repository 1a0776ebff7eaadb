//! Per-shard outcomes and the write-once slots collecting them.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::action::response::ShardFailure;
use crate::cluster::ShardId;
use crate::error::{Result, TermsCountError};
use crate::transport::message::ShardTermsResponse;

/// What happened to one dispatched shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardOutcome {
    /// The shard was no longer active on its owner; it is skipped.
    NotServable(ShardId),

    /// The shard operation was attempted and failed.
    Failure(ShardFailure),

    /// Local term counts of the shard.
    Success(ShardTermsResponse),
}

impl ShardOutcome {
    /// Classify the result of a shard operation.
    pub fn from_result(shard_id: &ShardId, result: Result<ShardTermsResponse>) -> Self {
        match result {
            Ok(response) => ShardOutcome::Success(response),
            Err(TermsCountError::NotServable(shard)) => ShardOutcome::NotServable(shard),
            Err(e) => ShardOutcome::Failure(ShardFailure::new(shard_id, e.to_string())),
        }
    }
}

/// Fixed set of outcome slots, one per dispatched shard, indexed by dispatch
/// order.
///
/// Each slot is written at most once, from any thread. [`wait`](Self::wait)
/// returns once every slot holds an outcome.
#[derive(Debug)]
pub struct OutcomeSlots {
    slots: Box<[OnceLock<ShardOutcome>]>,
    remaining: Mutex<usize>,
    all_filled: Condvar,
    cancelled: AtomicBool,
}

impl OutcomeSlots {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
            remaining: Mutex::new(len),
            all_filled: Condvar::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store the outcome of slot `index`.
    pub fn fill(&self, index: usize, outcome: ShardOutcome) -> Result<()> {
        let slot = self.slots.get(index).ok_or_else(|| {
            TermsCountError::invalid_operation(format!(
                "outcome slot {index} out of range (len {})",
                self.slots.len()
            ))
        })?;
        slot.set(outcome).map_err(|_| {
            TermsCountError::invalid_operation(format!("outcome slot {index} already filled"))
        })?;

        let mut remaining = self.remaining.lock();
        *remaining -= 1;
        if *remaining == 0 {
            self.all_filled.notify_all();
        }
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    /// Block until every slot is filled.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.all_filled.wait(&mut remaining);
        }
    }

    /// Block until every slot is filled or `timeout` elapses. Returns whether
    /// all slots were filled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        // A deadline past what Instant can represent never expires
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self
                .all_filled
                .wait_until(&mut remaining, deadline)
                .timed_out()
            {
                return *remaining == 0;
            }
        }
        true
    }

    /// Mark the collection abandoned. Work that has not started yet can check
    /// [`is_cancelled`](Self::is_cancelled) and skip itself.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// All outcomes in slot order, or an error naming the first empty slot.
    pub fn outcomes(&self) -> Result<Vec<&ShardOutcome>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.get().ok_or_else(|| {
                    TermsCountError::internal(format!("outcome slot {index} is empty"))
                })
            })
            .collect()
    }
}
