use serde::{Deserialize, Serialize};

use lp_ledger::LedgerConfig;
use lp_vault::VaultConfig;

use crate::error::{SdkError, SdkResult};

/// Combined configuration, read from a TOML file with `[ledger]` and
/// `[vault]` tables. Either table may be omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PledgingConfig {
    pub ledger: LedgerConfig,
    pub vault: VaultConfig,
}

impl PledgingConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.ledger.validate()?;
        config.vault.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }
}
