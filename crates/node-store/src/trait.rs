//! NodeStoreTrait for mocking
//!
//! This trait abstracts access to the authoritative Node store so reconcilers
//! can be unit tested against an in-memory implementation.

use crate::error::NodeStoreError;
use k8s_openapi::api::core::v1::Node;

/// Trait for Node store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait NodeStoreTrait: Send + Sync + std::fmt::Debug {
    /// Check that the store is reachable and the credentials may list nodes
    async fn validate(&self) -> Result<(), NodeStoreError>;

    /// Fetch the current authoritative copy of a node by name
    async fn get_node(&self, name: &str) -> Result<Node, NodeStoreError>;

    /// Write the whole node back, conditional on its `resourceVersion`
    ///
    /// Returns `NodeStoreError::Conflict` if the stored version has moved
    /// since `node` was read.
    async fn replace_node(&self, node: &Node) -> Result<Node, NodeStoreError>;
}
