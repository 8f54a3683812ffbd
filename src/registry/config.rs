use serde::{Deserialize, Serialize};

use crate::core::{CompositeError, Result};

/// What to do when a composite type is declared again with a different
/// field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftPolicy {
    /// Fail with `FieldDrift`.
    #[default]
    Reject,
    /// Keep the first declaration and ignore the new one.
    KeepFirst,
}

/// Composite registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Handling of redeclarations with a different field list
    pub drift_policy: DriftPolicy,

    /// Re-attempt registration when a pending type is used
    pub retry_on_use: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            drift_policy: DriftPolicy::Reject,
            retry_on_use: true,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the drift policy
    pub fn drift_policy(mut self, policy: DriftPolicy) -> Self {
        self.drift_policy = policy;
        self
    }

    /// Enable or disable retry-on-use for pending types
    pub fn retry_on_use(mut self, enabled: bool) -> Self {
        self.retry_on_use = enabled;
        self
    }

    /// Parse from JSON; absent keys keep their defaults and unknown keys
    /// are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pgcomposite::{DriftPolicy, RegistryConfig};
    /// let config = RegistryConfig::from_json(r#"{"drift_policy": "keep_first"}"#).unwrap();
    /// assert_eq!(config.drift_policy, DriftPolicy::KeepFirst);
    /// assert!(config.retry_on_use);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| {
            CompositeError::Configuration(format!("invalid registry config: {}", err))
        })
    }
}
