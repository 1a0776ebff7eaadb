//! Operational blocks at cluster and index level.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TermsCountError;

/// Kind of operation a block applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterBlockLevel {
    Read,
    Write,
    Metadata,
}

/// A single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterBlock {
    pub id: u32,
    pub description: String,
    pub levels: Vec<ClusterBlockLevel>,
}

impl ClusterBlock {
    pub fn new<S: Into<String>>(id: u32, description: S, levels: Vec<ClusterBlockLevel>) -> Self {
        Self {
            id,
            description: description.into(),
            levels,
        }
    }

    pub fn applies_to(&self, level: ClusterBlockLevel) -> bool {
        self.levels.contains(&level)
    }
}

/// All blocks currently in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterBlocks {
    #[serde(default)]
    pub global: Vec<ClusterBlock>,

    #[serde(default)]
    pub indices: BTreeMap<String, Vec<ClusterBlock>>,
}

impl ClusterBlocks {
    /// Error if a global block applies at `level`.
    pub fn global_blocked_error(&self, level: ClusterBlockLevel) -> Option<TermsCountError> {
        let blocked: Vec<String> = self
            .global
            .iter()
            .filter(|block| block.applies_to(level))
            .map(describe)
            .collect();
        if blocked.is_empty() {
            None
        } else {
            Some(TermsCountError::cluster_blocked(format!(
                "blocked by: {}",
                blocked.join(", ")
            )))
        }
    }

    /// Error if any of `indices` carries a block at `level`.
    pub fn indices_blocked_error(
        &self,
        level: ClusterBlockLevel,
        indices: &[String],
    ) -> Option<TermsCountError> {
        let blocked: Vec<String> = indices
            .iter()
            .filter_map(|index| self.indices.get(index).map(|blocks| (index, blocks)))
            .flat_map(|(index, blocks)| {
                blocks
                    .iter()
                    .filter(move |block| block.applies_to(level))
                    .map(move |block| format!("index [{index}] {}", describe(block)))
            })
            .collect();
        if blocked.is_empty() {
            None
        } else {
            Some(TermsCountError::cluster_blocked(format!(
                "blocked by: {}",
                blocked.join(", ")
            )))
        }
    }
}

fn describe(block: &ClusterBlock) -> String {
    format!("[{}/{}]", block.id, block.description)
}
