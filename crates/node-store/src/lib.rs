//! Kubernetes Node store client
//!
//! Read and compare-and-swap write access to cluster `Node` objects, plus the
//! taint model the controller converges onto matching nodes.
//!
//! # Example
//!
//! ```no_run
//! use node_store::{KubeNodeStore, NodeStoreTrait, TaintSpec};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeNodeStore::new(client);
//!
//! let mut node = store.get_node("system-pool-a").await?;
//! let spec = TaintSpec::critical_addons_only();
//! node_store::push_taint(&mut node, spec.to_taint());
//!
//! // Rejected with NodeStoreError::Conflict if the node moved since the read
//! let updated = store.replace_node(&node).await?;
//! # let _ = updated;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeNodeStore;
pub use error::NodeStoreError;
pub use models::*;
pub use store_trait::NodeStoreTrait;
#[cfg(feature = "test-util")]
pub use mock::MockNodeStore;
