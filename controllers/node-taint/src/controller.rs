//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Node event
//! source to the reconciler. The event source runs on its own task and feeds
//! a channel; the processing routine holds every event back until the first
//! `Synced` signal, then reconciles each node on a bounded set of worker
//! tasks.

use crate::backoff::ConflictBackoff;
use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::{NodeEvent, NodeEventSource};
use k8s_openapi::api::core::v1::Node;
use kube::Client;
use node_store::{KubeNodeStore, NodeStoreTrait};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

/// Main controller for node taint management.
#[derive(Debug)]
pub struct Controller {
    reconciler: Arc<Reconciler>,
    events: mpsc::Receiver<NodeEvent>,
    node_watcher: JoinHandle<Result<(), ControllerError>>,
    worker_concurrency: usize,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// Fails if the Kubernetes client cannot be built or nodes cannot be
    /// listed; there is no degraded mode.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Node Taint Controller");

        let kube_client = Client::try_default().await?;
        let store = KubeNodeStore::new(kube_client);

        info!("Validating Kubernetes connectivity...");
        store.validate().await.map_err(|e| {
            error!("Failed to list nodes: {}", e);
            error!("Please ensure:");
            error!("  1. The API server is reachable from this pod");
            error!("  2. The service account may get, list, watch and update nodes");
            ControllerError::Store(e)
        })?;
        info!("Kubernetes connectivity established");

        let backoff = ConflictBackoff::default();
        info!(
            "Conflict retry: {} attempts, waits {:?}",
            backoff.max_attempts(),
            backoff.delays().collect::<Vec<_>>()
        );

        let source = NodeEventSource::new(store.api().clone(), config.resync_period);
        let reconciler = Arc::new(Reconciler::new(Arc::new(store), config.reconciler, backoff));

        let (tx, events) = mpsc::channel(config.event_channel_capacity);
        let node_watcher = tokio::spawn(async move { source.run(tx).await });

        Ok(Self {
            reconciler,
            events,
            node_watcher,
            worker_concurrency: config.worker_concurrency,
        })
    }

    /// Runs the controller until the event source exits.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Node Taint Controller running");

        let Self {
            reconciler,
            events,
            mut node_watcher,
            worker_concurrency,
        } = self;

        // The source should run forever; either branch finishing is fatal
        tokio::select! {
            result = &mut node_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Node watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Node watcher error: {}", e)))?;
            }
            result = process_events(reconciler, events, worker_concurrency) => {
                result?;
            }
        }

        Err(ControllerError::Watch("Node watcher exited".to_string()))
    }
}

/// Consumes events until the channel closes.
///
/// Events received before the first `Synced` are buffered so no node is acted
/// on from a partial listing. At most `concurrency` reconciliations run at
/// once; in-flight ones are awaited before returning.
pub async fn process_events(
    reconciler: Arc<Reconciler>,
    mut events: mpsc::Receiver<NodeEvent>,
    concurrency: usize,
) -> Result<(), ControllerError> {
    let concurrency = concurrency.max(1);
    let mut workers = JoinSet::new();
    let mut pending: Option<Vec<Node>> = Some(Vec::new());

    while let Some(event) = events.recv().await {
        let Some(node) = event.into_node() else {
            if let Some(buffered) = pending.take() {
                info!("Node cache synchronized, processing {} buffered events", buffered.len());
                for node in buffered {
                    spawn_reconcile(&mut workers, &reconciler, node, concurrency).await;
                }
            }
            continue;
        };

        match pending.as_mut() {
            Some(buffer) => buffer.push(node),
            None => spawn_reconcile(&mut workers, &reconciler, node, concurrency).await,
        }
    }

    while let Some(joined) = workers.join_next().await {
        log_join(joined);
    }
    Ok(())
}

async fn spawn_reconcile(
    workers: &mut JoinSet<()>,
    reconciler: &Arc<Reconciler>,
    node: Node,
    concurrency: usize,
) {
    while workers.len() >= concurrency {
        match workers.join_next().await {
            Some(joined) => log_join(joined),
            None => break,
        }
    }

    let reconciler = Arc::clone(reconciler);
    workers.spawn(async move {
        reconciler.dispatch(&node).await;
    });
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!("Reconcile task panicked: {}", e);
    }
}
