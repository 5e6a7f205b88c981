//! Node store errors

use thiserror::Error;

/// HTTP status the API server returns for a missing object.
const STATUS_NOT_FOUND: u16 = 404;
/// HTTP status the API server returns when `resourceVersion` is stale.
const STATUS_CONFLICT: u16 = 409;

/// Errors that can occur when reading or writing Node objects
#[derive(Debug, Error)]
pub enum NodeStoreError {
    /// Node does not exist (HTTP 404)
    #[error("Node not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency rejection: the node changed since it was read (HTTP 409)
    #[error("Conflict writing node: {0}")]
    Conflict(String),

    /// Any other Kubernetes API or transport failure
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Object cannot be written as-is (e.g. missing name)
    #[error("Invalid object: {0}")]
    InvalidObject(String),
}

impl NodeStoreError {
    /// Classify a `kube::Error` returned for an operation on `name`.
    ///
    /// 404 and 409 responses become `NotFound` and `Conflict`; everything
    /// else is kept as a transient `Kube` error.
    pub fn from_kube(err: kube::Error, name: &str) -> Self {
        if let kube::Error::Api(resp) = &err {
            match resp.code {
                STATUS_NOT_FOUND => return Self::NotFound(name.to_string()),
                STATUS_CONFLICT => {
                    return Self::Conflict(format!("{}: {}", name, resp.message));
                }
                _ => {}
            }
        }
        Self::Kube(err)
    }

    /// True for version-mismatch rejections that are worth retrying in-process.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
