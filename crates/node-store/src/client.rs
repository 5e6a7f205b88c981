//! Kubernetes-backed Node store
//!
//! Wraps a cluster-scoped `Api<Node>`. Conditional writes use `replace`, which
//! sends `metadata.resourceVersion` back to the API server; a stale version is
//! rejected with 409 and surfaced as `NodeStoreError::Conflict`.

use crate::error::NodeStoreError;
use crate::models::node_name;
use crate::store_trait::NodeStoreTrait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use std::fmt;
use tracing::debug;

/// Node store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeNodeStore {
    api: Api<Node>,
}

impl KubeNodeStore {
    /// Create a store over all nodes in the cluster
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }

    /// Underlying API handle, shared with the watcher
    pub fn api(&self) -> &Api<Node> {
        &self.api
    }
}

impl fmt::Debug for KubeNodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeNodeStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl NodeStoreTrait for KubeNodeStore {
    async fn validate(&self) -> Result<(), NodeStoreError> {
        debug!("Validating Kubernetes connectivity by listing nodes");
        self.api
            .list(&ListParams::default().limit(1))
            .await
            .map(|_| ())
            .map_err(NodeStoreError::Kube)
    }

    async fn get_node(&self, name: &str) -> Result<Node, NodeStoreError> {
        debug!("GET node {}", name);
        self.api
            .get(name)
            .await
            .map_err(|e| NodeStoreError::from_kube(e, name))
    }

    async fn replace_node(&self, node: &Node) -> Result<Node, NodeStoreError> {
        let name = node_name(node)
            .ok_or_else(|| NodeStoreError::InvalidObject("node has no name".to_string()))?;
        if node.metadata.resource_version.is_none() {
            // Without a version the API server would accept the write unconditionally
            return Err(NodeStoreError::InvalidObject(format!(
                "node {} has no resourceVersion",
                name
            )));
        }

        debug!(
            "PUT node {} at resourceVersion {}",
            name,
            node.metadata.resource_version.as_deref().unwrap_or_default()
        );
        self.api
            .replace(name, &PostParams::default(), node)
            .await
            .map_err(|e| NodeStoreError::from_kube(e, name))
    }
}
