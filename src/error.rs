//! Typed errors surfaced by graph construction and snapshot loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling a [`Graph`](crate::graph::Graph).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Two edges share the same `(source, target)` pair but disagree on the weight.
    #[error("duplicate edge {source_id} -> {target_id} with conflicting weights")]
    DuplicateEdge { source_id: usize, target_id: usize },

    /// An edge references an agent outside the population.
    #[error("edge {source_id} -> {target_id} references an unknown agent (population size {n_agents})")]
    UnknownAgent {
        source_id: usize,
        target_id: usize,
        n_agents: usize,
    },

    /// Agent ids must equal their index in the population array.
    #[error("agent at index {index} has id {id}")]
    AgentIdMismatch { index: usize, id: usize },
}

/// Errors raised while loading a simulator snapshot.
///
/// Loading is all-or-nothing: on error no state has been installed.
#[derive(Debug, Error)]
pub enum SnapshotLoadError {
    #[error("failed to open snapshot {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode snapshot {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rmp_serde::decode::Error,
    },

    #[error("snapshot {path:?} is inconsistent: {reason}")]
    Inconsistent { path: PathBuf, reason: String },
}
