//! Kubernetes Node event source.
//!
//! Turns the `kube_runtime::watcher` stream over all nodes into typed
//! add/update events on a channel, with an initial-sync signal and periodic
//! resync. Delivery is at-least-once: relists and resyncs re-deliver nodes
//! that may already be converged.

use crate::error::ControllerError;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::Api;
use kube_runtime::{watcher, WatchStreamExt};
use node_store::node_name;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Notification delivered to the processing routine.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// Node seen for the first time
    Added(Node),
    /// Node seen again; `old` is the previously delivered snapshot
    Updated { old: Node, new: Node },
    /// Initial listing complete; every pre-existing node has been delivered
    Synced,
}

impl NodeEvent {
    /// Latest node snapshot carried by the event; `None` for `Synced`.
    pub fn into_node(self) -> Option<Node> {
        match self {
            NodeEvent::Added(node) | NodeEvent::Updated { new: node, .. } => Some(node),
            NodeEvent::Synced => None,
        }
    }
}

/// Last-seen snapshot per node, used to classify events and drive resync.
///
/// Never consulted for taint state; the reconciler always re-reads the store.
#[derive(Debug, Default)]
pub struct NodeCache {
    nodes: HashMap<String, Node>,
    /// Names returned by the listing in progress, between `Init` and `InitDone`
    listing: Option<HashSet<String>>,
    synced: bool,
}

impl NodeCache {
    /// Folds one watcher event into the cache, returning what to deliver.
    pub fn observe(&mut self, event: watcher::Event<Node>) -> Vec<NodeEvent> {
        match event {
            watcher::Event::Init => {
                debug!("Node listing started");
                self.listing = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(node) => {
                if let (Some(listing), Some(name)) = (self.listing.as_mut(), node_name(&node)) {
                    listing.insert(name.to_string());
                }
                self.upsert(node).into_iter().collect()
            }
            watcher::Event::InitDone => {
                if let Some(seen) = self.listing.take() {
                    // Nodes deleted while the watch was down
                    self.nodes.retain(|name, _| seen.contains(name));
                }
                self.synced = true;
                info!("Node listing complete, {} nodes known", self.nodes.len());
                vec![NodeEvent::Synced]
            }
            watcher::Event::Apply(node) => self.upsert(node).into_iter().collect(),
            watcher::Event::Delete(node) => {
                if let Some(name) = node_name(&node) {
                    debug!("Node deleted: {}", name);
                    self.nodes.remove(name);
                }
                Vec::new()
            }
        }
    }

    /// Re-delivers every known node as an update. Empty until the first sync.
    pub fn resync(&self) -> Vec<NodeEvent> {
        if !self.synced {
            return Vec::new();
        }
        self.nodes
            .values()
            .map(|node| NodeEvent::Updated {
                old: node.clone(),
                new: node.clone(),
            })
            .collect()
    }

    /// Number of nodes currently known.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn upsert(&mut self, node: Node) -> Option<NodeEvent> {
        let Some(name) = node_name(&node).map(str::to_string) else {
            warn!("Ignoring node event without a name");
            return None;
        };
        match self.nodes.insert(name, node.clone()) {
            Some(old) => Some(NodeEvent::Updated { old, new: node }),
            None => Some(NodeEvent::Added(node)),
        }
    }
}

/// Watches all cluster nodes and pushes `NodeEvent`s onto a channel.
#[derive(Debug)]
pub struct NodeEventSource {
    api: Api<Node>,
    resync_period: Duration,
    cache: NodeCache,
}

impl NodeEventSource {
    /// Creates a new event source.
    pub fn new(api: Api<Node>, resync_period: Duration) -> Self {
        Self {
            api,
            resync_period,
            cache: NodeCache::default(),
        }
    }

    /// Streams events into `tx` until the receiver is dropped.
    ///
    /// Watch errors are logged and the watch is re-established with backoff;
    /// they never end the stream.
    pub async fn run(mut self, tx: mpsc::Sender<NodeEvent>) -> Result<(), ControllerError> {
        info!("Starting Node watcher (resync every {:?})", self.resync_period);

        let mut stream = Box::pin(
            watcher(self.api.clone(), watcher::Config::default()).default_backoff(),
        );

        let mut resync = tokio::time::interval(self.resync_period);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        resync.tick().await;

        loop {
            let events = tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(event)) => self.cache.observe(event),
                    Some(Err(e)) => {
                        warn!("Node watcher stream error: {}", e);
                        continue;
                    }
                    None => {
                        return Err(ControllerError::Watch("Node watch stream ended".to_string()));
                    }
                },
                _ = resync.tick() => {
                    debug!("Resyncing {} nodes", self.cache.node_count());
                    self.cache.resync()
                }
            };

            for event in events {
                tx.send(event)
                    .await
                    .map_err(|e| ControllerError::Watch(format!("Node event receiver dropped: {}", e)))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_node;

    fn names(events: &[NodeEvent]) -> Vec<String> {
        let mut names: Vec<String> = events
            .iter()
            .filter_map(|e| e.clone().into_node())
            .filter_map(|node| node_name(&node).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    fn initial_sync(cache: &mut NodeCache, nodes: &[&str]) -> Vec<NodeEvent> {
        let mut events = cache.observe(watcher::Event::Init);
        for name in nodes {
            events.extend(cache.observe(watcher::Event::InitApply(create_test_node(name, vec![]))));
        }
        events.extend(cache.observe(watcher::Event::InitDone));
        events
    }

    #[test]
    fn test_initial_sync_adds_then_signals() {
        let mut cache = NodeCache::default();
        let events = initial_sync(&mut cache, &["worker-1", "system-pool-a"]);

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], NodeEvent::Added(_)));
        assert!(matches!(events[1], NodeEvent::Added(_)));
        assert!(matches!(events[2], NodeEvent::Synced));
        assert_eq!(names(&events), vec!["system-pool-a", "worker-1"]);
    }

    #[test]
    fn test_apply_of_known_node_is_update() {
        let mut cache = NodeCache::default();
        initial_sync(&mut cache, &["system-pool-a"]);

        let mut changed = create_test_node("system-pool-a", vec![]);
        changed.metadata.resource_version = Some("42".to_string());
        let events = cache.observe(watcher::Event::Apply(changed));

        assert_eq!(events.len(), 1);
        match &events[0] {
            NodeEvent::Updated { old, new } => {
                assert_eq!(old.metadata.resource_version, None);
                assert_eq!(new.metadata.resource_version.as_deref(), Some("42"));
            }
            other => panic!("expected update, got {:?}", other),
        }

        let events = cache.observe(watcher::Event::Apply(create_test_node("system-pool-b", vec![])));
        assert!(matches!(events[0], NodeEvent::Added(_)));
    }

    #[test]
    fn test_resync_waits_for_sync() {
        let mut cache = NodeCache::default();
        cache.observe(watcher::Event::Init);
        cache.observe(watcher::Event::InitApply(create_test_node("system-pool-a", vec![])));
        assert!(cache.resync().is_empty());

        cache.observe(watcher::Event::InitDone);
        let events = cache.resync();
        assert_eq!(names(&events), vec!["system-pool-a"]);
        assert!(matches!(events[0], NodeEvent::Updated { .. }));
    }

    #[test]
    fn test_delete_evicts_without_event() {
        let mut cache = NodeCache::default();
        initial_sync(&mut cache, &["system-pool-a", "worker-1"]);

        let events = cache.observe(watcher::Event::Delete(create_test_node("worker-1", vec![])));
        assert!(events.is_empty());
        assert_eq!(names(&cache.resync()), vec!["system-pool-a"]);
    }

    #[test]
    fn test_relist_evicts_nodes_missing_from_listing() {
        let mut cache = NodeCache::default();
        initial_sync(&mut cache, &["system-pool-a", "worker-1"]);

        let events = initial_sync(&mut cache, &["system-pool-a"]);
        assert!(matches!(events[0], NodeEvent::Updated { .. }));
        assert!(matches!(events.last(), Some(NodeEvent::Synced)));
        assert_eq!(cache.node_count(), 1);
        assert_eq!(names(&cache.resync()), vec!["system-pool-a"]);
    }

    #[test]
    fn test_nameless_node_ignored() {
        let mut cache = NodeCache::default();
        let events = cache.observe(watcher::Event::Apply(Node::default()));
        assert!(events.is_empty());
        assert_eq!(cache.node_count(), 0);
    }
}
