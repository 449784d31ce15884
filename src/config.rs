use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session configuration
// ---------------------------------------------------------------------------

/// How a "clean missing values" intent expands into a transform step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Drop rows with missing values.
    #[default]
    Drop,
    /// Fill missing numeric values with the column median.
    Impute,
}

/// Options recognized at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of cached artifacts before LRU eviction.
    pub cache_size_bound: usize,
    pub missing_value_policy: MissingValuePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cache_size_bound: 64,
            missing_value_policy: MissingValuePolicy::Drop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());

        let config: SessionConfig =
            serde_json::from_str(r#"{"missing_value_policy": "impute", "cache_size_bound": 8}"#)
                .unwrap();
        assert_eq!(config.missing_value_policy, MissingValuePolicy::Impute);
        assert_eq!(config.cache_size_bound, 8);
    }
}
