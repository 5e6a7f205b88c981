//! Test utilities for unit testing the reconciler and event source
//!
//! This module provides helpers for creating test nodes and stores.

use crate::backoff::ConflictBackoff;
use crate::config::ReconcilerConfig;
use crate::reconciler::Reconciler;
use k8s_openapi::api::core::v1::{Node, NodeSpec, Taint};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use node_store::MockNodeStore;
use std::sync::Arc;
use std::time::Duration;

/// Helper to create a test taint
pub fn create_test_taint(key: &str, value: &str, effect: &str) -> Taint {
    Taint {
        key: key.to_string(),
        value: Some(value.to_string()),
        effect: effect.to_string(),
        time_added: None,
    }
}

/// Helper to create a test Node with the given taints
pub fn create_test_node(name: &str, taints: Vec<Taint>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            taints: if taints.is_empty() { None } else { Some(taints) },
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to parse a Node from its API JSON representation
pub fn node_from_json(value: serde_json::Value) -> Node {
    serde_json::from_value(value).expect("valid Node JSON")
}

/// Backoff with the default attempt budget and negligible waits
pub fn fast_backoff() -> ConflictBackoff {
    ConflictBackoff::new(5, Duration::from_millis(1), 2.0, Duration::from_millis(5))
}

/// Helper to create a reconciler over a mock store with default policy
pub fn create_test_reconciler(store: &MockNodeStore) -> Reconciler {
    Reconciler::new(
        Arc::new(store.clone()),
        ReconcilerConfig::default(),
        fast_backoff(),
    )
}
