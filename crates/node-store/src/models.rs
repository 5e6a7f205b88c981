//! Taint model and Node accessors
//!
//! Nodes and taints are the upstream `k8s_openapi` types; this module adds the
//! typed effect, the desired-taint description, and small helpers for reading
//! the fields the controller cares about.

use k8s_openapi::api::core::v1::{Node, NodeSpec, Taint};
use std::fmt;
use std::str::FromStr;

/// Effect of a taint on pods that do not tolerate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaintEffect {
    /// Do not schedule new pods
    NoSchedule,
    /// Avoid scheduling new pods if possible
    PreferNoSchedule,
    /// Evict running pods and do not schedule new ones
    NoExecute,
}

impl TaintEffect {
    /// Wire representation used in `spec.taints[].effect`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaintEffect::NoSchedule => "NoSchedule",
            TaintEffect::PreferNoSchedule => "PreferNoSchedule",
            TaintEffect::NoExecute => "NoExecute",
        }
    }
}

impl fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaintEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NoSchedule" => Ok(TaintEffect::NoSchedule),
            "PreferNoSchedule" => Ok(TaintEffect::PreferNoSchedule),
            "NoExecute" => Ok(TaintEffect::NoExecute),
            other => Err(format!("unknown taint effect: {}", other)),
        }
    }
}

/// Desired taint to converge onto selected nodes.
///
/// Matching ignores `value`: a node already carrying `key`/`effect` with any
/// value counts as tainted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaintSpec {
    pub key: String,
    pub value: String,
    pub effect: TaintEffect,
}

impl TaintSpec {
    /// `CriticalAddonsOnly=true:NoSchedule`
    pub fn critical_addons_only() -> Self {
        Self {
            key: "CriticalAddonsOnly".to_string(),
            value: "true".to_string(),
            effect: TaintEffect::NoSchedule,
        }
    }

    /// True if `taint` has this spec's key and effect.
    pub fn matches(&self, taint: &Taint) -> bool {
        taint.key == self.key && taint.effect == self.effect.as_str()
    }

    /// Build the upstream taint object.
    pub fn to_taint(&self) -> Taint {
        Taint {
            key: self.key.clone(),
            value: Some(self.value.clone()),
            effect: self.effect.as_str().to_string(),
            time_added: None,
        }
    }
}

impl Default for TaintSpec {
    fn default() -> Self {
        Self::critical_addons_only()
    }
}

impl fmt::Display for TaintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.key, self.value, self.effect)
    }
}

/// Node name, if set.
pub fn node_name(node: &Node) -> Option<&str> {
    node.metadata.name.as_deref()
}

/// Node `resourceVersion`, if set.
pub fn resource_version(node: &Node) -> Option<&str> {
    node.metadata.resource_version.as_deref()
}

/// Taints on the node, empty when `spec` or `spec.taints` is absent.
pub fn node_taints(node: &Node) -> &[Taint] {
    node.spec
        .as_ref()
        .and_then(|spec| spec.taints.as_deref())
        .unwrap_or(&[])
}

/// Append a taint, creating `spec`/`spec.taints` as needed.
pub fn push_taint(node: &mut Node, taint: Taint) {
    node.spec
        .get_or_insert_with(NodeSpec::default)
        .taints
        .get_or_insert_with(Vec::new)
        .push(taint);
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn taint(key: &str, value: Option<&str>, effect: &str) -> Taint {
        Taint {
            key: key.to_string(),
            value: value.map(str::to_string),
            effect: effect.to_string(),
            time_added: None,
        }
    }

    #[test]
    fn test_spec_matches_ignores_value() {
        let spec = TaintSpec::critical_addons_only();
        assert!(spec.matches(&taint("CriticalAddonsOnly", Some("x"), "NoSchedule")));
        assert!(spec.matches(&taint("CriticalAddonsOnly", None, "NoSchedule")));
    }

    #[test]
    fn test_spec_requires_key_and_effect() {
        let spec = TaintSpec::critical_addons_only();
        assert!(!spec.matches(&taint("CriticalAddonsOnly", Some("true"), "NoExecute")));
        assert!(!spec.matches(&taint("criticaladdonsonly", Some("true"), "NoSchedule")));
        assert!(!spec.matches(&taint("dedicated", Some("true"), "NoSchedule")));
    }

    #[test]
    fn test_to_taint() {
        let t = TaintSpec::critical_addons_only().to_taint();
        assert_eq!(t.key, "CriticalAddonsOnly");
        assert_eq!(t.value.as_deref(), Some("true"));
        assert_eq!(t.effect, "NoSchedule");
        assert!(t.time_added.is_none());
    }

    #[test]
    fn test_effect_parse() {
        for effect in [
            TaintEffect::NoSchedule,
            TaintEffect::PreferNoSchedule,
            TaintEffect::NoExecute,
        ] {
            assert_eq!(effect.as_str().parse::<TaintEffect>(), Ok(effect));
        }
        assert!("noschedule".parse::<TaintEffect>().is_err());
    }

    #[test]
    fn test_push_taint_creates_spec() {
        let mut node = Node {
            metadata: ObjectMeta {
                name: Some("system-pool-a".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(node_taints(&node).is_empty());

        push_taint(&mut node, TaintSpec::critical_addons_only().to_taint());
        assert_eq!(node_taints(&node).len(), 1);
        assert_eq!(node_name(&node), Some("system-pool-a"));
    }
}
