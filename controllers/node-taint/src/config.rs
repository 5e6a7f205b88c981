//! Controller configuration.
//!
//! Built once in `main` from environment variables and passed down by value;
//! nothing reads the environment after startup.

use crate::error::ControllerError;
use node_store::TaintSpec;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_NAME_SUBSTRING: &str = "system";
const DEFAULT_RESYNC_PERIOD_SECS: u64 = 30;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_WORKER_CONCURRENCY: usize = 1;

/// Selection rule and desired taint for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Nodes whose name contains this (case-sensitive) are tainted
    pub name_substring: String,
    /// Taint to converge onto selected nodes
    pub taint: TaintSpec,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            name_substring: DEFAULT_NAME_SUBSTRING.to_string(),
            taint: TaintSpec::critical_addons_only(),
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub reconciler: ReconcilerConfig,
    /// Period between full re-deliveries of every known node
    pub resync_period: Duration,
    /// Bound on queued events between the watcher and the workers
    pub event_channel_capacity: usize,
    /// Maximum nodes reconciled at once
    pub worker_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerConfig::default(),
            resync_period: Duration::from_secs(DEFAULT_RESYNC_PERIOD_SECS),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            worker_concurrency: DEFAULT_WORKER_CONCURRENCY,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load configuration from an explicit variable map.
    ///
    /// Recognised variables: `NODE_NAME_SUBSTRING`, `RESYNC_PERIOD_SECS`,
    /// `EVENT_CHANNEL_CAPACITY`, `WORKER_CONCURRENCY`. Missing variables take
    /// their defaults.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ControllerError> {
        let mut config = Self::default();

        if let Some(substring) = vars.get("NODE_NAME_SUBSTRING") {
            if substring.is_empty() {
                return Err(ControllerError::InvalidConfig(
                    "NODE_NAME_SUBSTRING must not be empty".to_string(),
                ));
            }
            config.reconciler.name_substring = substring.clone();
        }

        if let Some(secs) = parse_positive::<u64>(&vars, "RESYNC_PERIOD_SECS")? {
            config.resync_period = Duration::from_secs(secs);
        }
        if let Some(capacity) = parse_positive::<usize>(&vars, "EVENT_CHANNEL_CAPACITY")? {
            config.event_channel_capacity = capacity;
        }
        if let Some(workers) = parse_positive::<usize>(&vars, "WORKER_CONCURRENCY")? {
            config.worker_concurrency = workers;
        }

        Ok(config)
    }
}

fn parse_positive<T>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>, ControllerError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = vars.get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(Some(value)),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_reference_policy() {
        let config = Config::from_vars(HashMap::new()).unwrap();

        assert_eq!(config.reconciler.name_substring, "system");
        assert_eq!(config.reconciler.taint, TaintSpec::critical_addons_only());
        assert_eq!(config.resync_period, Duration::from_secs(30));
        assert_eq!(config.worker_concurrency, 1);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("NODE_NAME_SUBSTRING", "infra"),
            ("RESYNC_PERIOD_SECS", "120"),
            ("EVENT_CHANNEL_CAPACITY", "16"),
            ("WORKER_CONCURRENCY", "4"),
        ]))
        .unwrap();

        assert_eq!(config.reconciler.name_substring, "infra");
        assert_eq!(config.resync_period, Duration::from_secs(120));
        assert_eq!(config.event_channel_capacity, 16);
        assert_eq!(config.worker_concurrency, 4);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for (key, value) in [
            ("NODE_NAME_SUBSTRING", ""),
            ("RESYNC_PERIOD_SECS", "0"),
            ("RESYNC_PERIOD_SECS", "soon"),
            ("WORKER_CONCURRENCY", "-1"),
        ] {
            let result = Config::from_vars(vars(&[(key, value)]));
            assert!(
                matches!(result, Err(ControllerError::InvalidConfig(_))),
                "{}={:?} should be rejected",
                key,
                value
            );
        }
    }
}
