//! Runtime configuration.
//!
//! Read from environment variables at startup; Metalsoft credentials are
//! loaded separately by `metalsoft_client::Credentials`.

use crate::error::ControllerError;
use std::time::Duration;

/// Default ceiling for one reconcile pass
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default number of concurrent reconciles per kind
pub const DEFAULT_CONCURRENCY: u16 = 10;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    /// Only reconcile objects labelled `cluster.x-k8s.io/watch-filter=<value>`
    pub watch_filter_value: Option<String>,
    /// Deadline of a single reconcile pass
    pub reconcile_timeout: Duration,
    /// Concurrent MetalsoftCluster reconciles
    pub cluster_concurrency: u16,
    /// Concurrent MetalsoftMachine reconciles
    pub machine_concurrency: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            watch_filter_value: None,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            cluster_concurrency: DEFAULT_CONCURRENCY,
            machine_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an injectable variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let reconcile_timeout = match non_empty("RECONCILE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "RECONCILE_TIMEOUT_SECS must be a positive integer, got {:?}",
                        raw
                    )));
                }
            },
            None => DEFAULT_RECONCILE_TIMEOUT,
        };

        Ok(Self {
            namespace: non_empty("WATCH_NAMESPACE"),
            watch_filter_value: non_empty("WATCH_FILTER_VALUE"),
            reconcile_timeout,
            cluster_concurrency: concurrency(non_empty("METALSOFTCLUSTER_CONCURRENCY"), "METALSOFTCLUSTER_CONCURRENCY")?,
            machine_concurrency: concurrency(non_empty("METALSOFTMACHINE_CONCURRENCY"), "METALSOFTMACHINE_CONCURRENCY")?,
        })
    }

    /// Label selector matching the configured watch filter
    pub fn label_selector(&self) -> Option<String> {
        self.watch_filter_value
            .as_ref()
            .map(|value| format!("{}={}", crds::WATCH_FILTER_LABEL, value))
    }
}

fn concurrency(raw: Option<String>, key: &str) -> Result<u16, ControllerError> {
    match raw {
        None => Ok(DEFAULT_CONCURRENCY),
        Some(raw) => match raw.trim().parse::<u16>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ControllerError::InvalidConfig(format!(
                "{} must be a positive integer, got {:?}",
                key, raw
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.reconcile_timeout, Duration::from_secs(600));
        assert!(config.label_selector().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", "capi-system"),
            ("WATCH_FILTER_VALUE", "team-a"),
            ("RECONCILE_TIMEOUT_SECS", "90"),
            ("METALSOFTCLUSTER_CONCURRENCY", "2"),
            ("METALSOFTMACHINE_CONCURRENCY", "20"),
        ]))
        .unwrap();

        assert_eq!(config.namespace.as_deref(), Some("capi-system"));
        assert_eq!(config.reconcile_timeout, Duration::from_secs(90));
        assert_eq!(config.cluster_concurrency, 2);
        assert_eq!(config.machine_concurrency, 20);
        assert_eq!(config.label_selector().as_deref(), Some("cluster.x-k8s.io/watch-filter=team-a"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ControllerConfig::from_lookup(lookup(&[("RECONCILE_TIMEOUT_SECS", "0")])).is_err());
        assert!(ControllerConfig::from_lookup(lookup(&[("METALSOFTMACHINE_CONCURRENCY", "many")])).is_err());
    }

    #[test]
    fn test_blank_namespace_means_all() {
        let config = ControllerConfig::from_lookup(lookup(&[("WATCH_NAMESPACE", "  ")])).unwrap();
        assert!(config.namespace.is_none());
    }
}
