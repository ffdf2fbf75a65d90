use crate::collectors::COLLECTOR_NAMES;
use std::collections::HashSet;

/// Set of collector names that the registry will instantiate. Built once
/// from the CLI flags at startup.
#[derive(Clone, Debug, Default)]
pub struct CollectorConfig {
    pub enabled_collectors: HashSet<String>,
}

impl CollectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_enabled(mut self, collectors: &[String]) -> Self {
        self.enabled_collectors = collectors.iter().cloned().collect();
        self
    }

    /// Configuration with every known collector enabled.
    #[must_use]
    pub fn all() -> Self {
        Self {
            enabled_collectors: COLLECTOR_NAMES.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_collectors.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_enabled() {
        let config = CollectorConfig::new().with_enabled(&["global_status".to_string()]);
        assert!(config.is_enabled("global_status"));
        assert!(!config.is_enabled("exporter"));
    }

    #[test]
    fn test_all_enables_every_collector() {
        let config = CollectorConfig::all();
        for name in COLLECTOR_NAMES {
            assert!(config.is_enabled(name), "{name} should be enabled");
        }
    }
}
