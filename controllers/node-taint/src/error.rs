//! Controller-specific error types.
//!
//! `ReconcileError` is contained to a single node's reconciliation and is
//! only ever logged. `ControllerError` is fatal and ends the process.

use node_store::NodeStoreError;
use thiserror::Error;

/// Errors from reconciling one node.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Fetch or write failed for a reason other than a version conflict
    #[error("Node store error: {0}")]
    Store(#[from] NodeStoreError),

    /// Every attempt within the retry budget hit a write conflict
    #[error("Gave up on node {node} after {attempts} conflicting writes")]
    RetryExhausted { node: String, attempts: u32 },

    /// Event carried a node without `metadata.name`
    #[error("Node has no name")]
    MissingName,
}

/// Errors that terminate the Node Taint Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client bootstrap error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Store unreachable at startup
    #[error("Node store error: {0}")]
    Store(#[from] NodeStoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
