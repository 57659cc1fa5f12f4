//! Escrow vault for liquid pledging.
//!
//! The vault holds deposited value per token and pays out withdrawals the
//! ledger has authorized. Confirming or canceling a payment requires a
//! capability granted by the vault owner; an escape hatch lets the owner or
//! designated callers pull funds out to a fixed destination in an emergency.

pub mod capability;
pub mod config;
pub mod error;
pub mod payment;
pub mod vault;

pub use capability::{Capability, CapabilityKind, CapabilitySet};
pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use payment::{Payment, PaymentId, PaymentStatus};
pub use vault::{Vault, VaultEvent};
