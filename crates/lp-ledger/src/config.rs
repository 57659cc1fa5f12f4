use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Structural limits enforced by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum number of delegates attached to a single pledge.
    pub max_delegates: usize,
    /// Maximum project nesting depth. A root project has depth 1.
    pub max_project_depth: usize,
    /// Maximum number of `old_pledge` hops from any pledge to its root.
    /// Every lineage walk is bounded by this value.
    pub max_lineage_depth: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_delegates: 10,
            max_project_depth: 20,
            max_lineage_depth: 64,
        }
    }
}

impl LedgerConfig {
    /// Parse a config from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, LedgerError> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make the ledger unusable.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_delegates == 0 {
            return Err(LedgerError::Config("max_delegates must be at least 1".into()));
        }
        if self.max_project_depth == 0 {
            return Err(LedgerError::Config(
                "max_project_depth must be at least 1".into(),
            ));
        }
        // donate -> propose -> commit needs two hops below the root.
        if self.max_lineage_depth < 2 {
            return Err(LedgerError::Config(
                "max_lineage_depth must be at least 2".into(),
            ));
        }
        Ok(())
    }
}
