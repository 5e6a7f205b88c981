//! Mock NodeStore for unit testing
//!
//! In-memory implementation of `NodeStoreTrait` with the same optimistic
//! concurrency contract as the API server: every successful write advances
//! `resourceVersion`, and a write carrying a stale version is rejected with
//! `NodeStoreError::Conflict`.
//!
//! Tests simulate racing writers with [`MockNodeStore::push_concurrent_write`]:
//! the queued closure is applied to the stored node just before the next
//! `replace_node` call is checked, so the conflict is a genuine version
//! mismatch rather than a canned error.

use crate::error::NodeStoreError;
use crate::models::{node_name, resource_version};
use crate::store_trait::NodeStoreTrait;
use k8s_openapi::api::core::v1::Node;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type ConcurrentWrite = Box<dyn FnOnce(&mut Node) + Send>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock Node store for testing
#[derive(Clone, Default)]
pub struct MockNodeStore {
    nodes: Arc<Mutex<HashMap<String, Node>>>,
    version: Arc<AtomicUsize>,
    concurrent_writes: Arc<Mutex<VecDeque<ConcurrentWrite>>>,
    get_failures: Arc<Mutex<VecDeque<NodeStoreError>>>,
    get_calls: Arc<AtomicUsize>,
    replace_calls: Arc<AtomicUsize>,
    committed_writes: Arc<AtomicUsize>,
}

impl MockNodeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Add a node (for test setup). Assigns a fresh `resourceVersion` and
    /// returns the stored copy.
    pub fn add_node(&self, mut node: Node) -> Node {
        let name = node_name(&node).unwrap_or_default().to_string();
        node.metadata.resource_version = Some(self.next_version());
        lock(&self.nodes).insert(name, node.clone());
        node
    }

    /// Current stored copy of a node
    pub fn node(&self, name: &str) -> Option<Node> {
        lock(&self.nodes).get(name).cloned()
    }

    /// Queue a write by another actor, applied just before the next
    /// `replace_node` is evaluated. The stored version always advances, so
    /// the incoming write conflicts.
    pub fn push_concurrent_write<F>(&self, write: F)
    where
        F: FnOnce(&mut Node) + Send + 'static,
    {
        lock(&self.concurrent_writes).push_back(Box::new(write));
    }

    /// Queue `count` concurrent writes that change nothing but the version
    pub fn push_conflicts(&self, count: usize) {
        for _ in 0..count {
            self.push_concurrent_write(|_| {});
        }
    }

    /// Fail the next `get_node` call with `err`
    pub fn fail_next_get(&self, err: NodeStoreError) {
        lock(&self.get_failures).push_back(err);
    }

    /// Number of `get_node` calls so far
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `replace_node` calls so far, including rejected ones
    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// Number of `replace_node` calls that were accepted
    pub fn committed_writes(&self) -> usize {
        self.committed_writes.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockNodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockNodeStore")
            .field("nodes", &lock(&self.nodes).len())
            .field("get_calls", &self.get_calls())
            .field("replace_calls", &self.replace_calls())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl NodeStoreTrait for MockNodeStore {
    async fn validate(&self) -> Result<(), NodeStoreError> {
        Ok(())
    }

    async fn get_node(&self, name: &str) -> Result<Node, NodeStoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.get_failures).pop_front() {
            return Err(err);
        }
        self.node(name)
            .ok_or_else(|| NodeStoreError::NotFound(name.to_string()))
    }

    async fn replace_node(&self, node: &Node) -> Result<Node, NodeStoreError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let name = node_name(node)
            .ok_or_else(|| NodeStoreError::InvalidObject("node has no name".to_string()))?
            .to_string();

        let racing = lock(&self.concurrent_writes).pop_front();
        let mut nodes = lock(&self.nodes);
        let stored = nodes
            .get_mut(&name)
            .ok_or_else(|| NodeStoreError::NotFound(name.clone()))?;

        if let Some(write) = racing {
            write(stored);
            stored.metadata.resource_version = Some(self.next_version());
        }

        if resource_version(node) != resource_version(stored) {
            return Err(NodeStoreError::Conflict(format!(
                "{}: resourceVersion {} is stale (current {})",
                name,
                resource_version(node).unwrap_or("<none>"),
                resource_version(stored).unwrap_or("<none>"),
            )));
        }

        let mut updated = node.clone();
        updated.metadata.resource_version = Some(self.next_version());
        *stored = updated.clone();
        self.committed_writes.fetch_add(1, Ordering::SeqCst);
        Ok(updated)
    }
}
