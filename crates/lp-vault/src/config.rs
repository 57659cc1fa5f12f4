use serde::{Deserialize, Serialize};

use lp_types::Address;

use crate::error::VaultError;

/// Vault configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Identity the vault uses when reporting settlements to the ledger.
    pub address: Address,
    /// Administers capabilities, autopay, and escape-hatch callers.
    pub owner: Address,
    /// Fixed recipient of escaped funds.
    pub escape_hatch_destination: Address,
    /// Addresses allowed to trigger the escape hatch besides the owner.
    pub escape_hatch_callers: Vec<Address>,
    /// Confirm payments as soon as they are authorized.
    pub autopay: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: Address::derive("lp-vault"),
            owner: Address::derive("vault-owner"),
            escape_hatch_destination: Address::derive("escape-hatch"),
            escape_hatch_callers: Vec::new(),
            autopay: false,
        }
    }
}

impl VaultConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, VaultError> {
        let config: Self = toml::from_str(s).map_err(|e| VaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.escape_hatch_destination == Address::ZERO {
            return Err(VaultError::Config(
                "escape_hatch_destination must not be the zero address".into(),
            ));
        }
        if self.owner == Address::ZERO {
            return Err(VaultError::Config("owner must not be the zero address".into()));
        }
        Ok(())
    }
}
