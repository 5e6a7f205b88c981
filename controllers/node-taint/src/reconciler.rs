//! Reconciliation logic for cluster nodes.
//!
//! The reconciler is level-triggered: every event, whether an add, an update
//! or a resync, is a full re-check against a fresh read of the node. It keeps
//! no state between invocations, so a lost event is repaired by the next one.
//!
//! Convergence is read, check, conditional write. A write that loses a
//! compare-and-swap race restarts from a fresh read, up to the backoff's
//! attempt budget. No locks are taken; concurrent invocations for the same
//! node are serialized by the store's version check.

use crate::backoff::ConflictBackoff;
use crate::config::ReconcilerConfig;
use crate::error::ReconcileError;
use k8s_openapi::api::core::v1::Node;
use node_store::{node_name, node_taints, push_taint, NodeStoreTrait};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Name did not match; no I/O performed
    Skipped,
    /// Fresh read already carried the taint; no write issued
    AlreadyTainted,
    /// Taint written on the given attempt
    Tainted { attempts: u32 },
    /// Reconciliation failed and was logged
    Failed,
}

/// Converges the configured taint onto matching nodes.
#[derive(Debug)]
pub struct Reconciler {
    store: Arc<dyn NodeStoreTrait>,
    config: ReconcilerConfig,
    backoff: ConflictBackoff,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        store: Arc<dyn NodeStoreTrait>,
        config: ReconcilerConfig,
        backoff: ConflictBackoff,
    ) -> Self {
        Self {
            store,
            config,
            backoff,
        }
    }

    /// Selection predicate: case-sensitive substring match on the node name.
    pub fn matches(&self, name: &str) -> bool {
        name.contains(self.config.name_substring.as_str())
    }

    /// Reconciles a node delivered by an add, update or resync event.
    ///
    /// The snapshot is only used for its name; the taint check always runs
    /// against a fresh read.
    pub async fn handle_node(&self, node: &Node) -> Result<Outcome, ReconcileError> {
        let name = node_name(node).ok_or(ReconcileError::MissingName)?;

        if !self.matches(name) {
            debug!("Node {} does not match '{}', skipping", name, self.config.name_substring);
            return Ok(Outcome::Skipped);
        }

        info!(
            "Node {} contains '{}' in its name, ensuring taint {}",
            name, self.config.name_substring, self.config.taint
        );
        self.ensure_taint(name).await
    }

    /// Convergence protocol for a single matching node.
    ///
    /// 1. Fetch the current node
    /// 2. Return `AlreadyTainted` if a taint with the configured key and effect exists
    /// 3. Append the taint and write, conditional on the fetched `resourceVersion`
    /// 4. On conflict, wait and start over from (1), at most `max_attempts()` times
    ///
    /// Non-conflict store errors abort immediately; the next event retries.
    pub async fn ensure_taint(&self, name: &str) -> Result<Outcome, ReconcileError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let mut current = self.store.get_node(name).await?;
            if self.has_taint(name, &current) {
                info!("Node {} already has taint {}", name, self.config.taint);
                return Ok(Outcome::AlreadyTainted);
            }

            push_taint(&mut current, self.config.taint.to_taint());

            match self.store.replace_node(&current).await {
                Ok(_) => {
                    info!("Taint {} applied to node {}", self.config.taint, name);
                    return Ok(Outcome::Tainted { attempts: attempt });
                }
                Err(e) if e.is_conflict() => match self.backoff.next_delay(attempt) {
                    Some(delay) => {
                        warn!(
                            "Conflict updating node {} (attempt {}/{}), retrying in {:?}",
                            name,
                            attempt,
                            self.backoff.max_attempts(),
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(ReconcileError::RetryExhausted {
                            node: name.to_string(),
                            attempts: attempt,
                        });
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Reconciles and logs; per-node errors never escape.
    pub async fn dispatch(&self, node: &Node) -> Outcome {
        match self.handle_node(node).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let name = node_name(node).unwrap_or("<unknown>");
                error!("Failed to reconcile node {}: {}", name, e);
                Outcome::Failed
            }
        }
    }

    fn has_taint(&self, name: &str, node: &Node) -> bool {
        node_taints(node).iter().any(|taint| {
            info!("Node {} taint: {}:{}", name, taint.key, taint.effect);
            self.config.taint.matches(taint)
        })
    }
}
