//! Reader abstraction over a shard's term space.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One term occurrence as seen by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldTerm {
    /// Field the term was indexed under.
    pub field: String,

    /// The term text.
    pub text: String,
}

impl FieldTerm {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
        }
    }
}

/// A point-in-time view of a shard's terms.
///
/// The snapshot is released when it is dropped, which happens on every exit
/// path of a scan.
pub trait TermSnapshot: Send {
    /// Advance to the next `(field, term)` pair.
    ///
    /// Returns `None` once the snapshot is exhausted. Order is stable for the
    /// lifetime of the snapshot.
    fn next_term(&mut self) -> Result<Option<FieldTerm>>;
}

/// Read access to one shard.
pub trait ShardReader: Send + Sync + Debug {
    /// Acquire an isolated snapshot of the shard's current terms.
    fn acquire_snapshot(&self) -> Result<Box<dyn TermSnapshot>>;
}
