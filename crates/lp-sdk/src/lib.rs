//! High-level SDK for liquid pledging.
//!
//! [`Pledging`] couples the pledge ledger with the escrow vault so that
//! donations are deposited, withdrawals become vault payments, and payment
//! settlements are reported back to the ledger, each as one atomic step.
//! This is the main entry point for applications embedding the ledger.

pub mod config;
pub mod error;
pub mod pledging;
pub mod report;

pub use config::PledgingConfig;
pub use error::{SdkError, SdkResult};
pub use pledging::Pledging;
pub use report::{TokenReconciliation, VerificationReport};

// Re-export key types
pub use lp_ledger::{
    AdminProfile, Holdings, HookResult, InvariantReport, JournalEntry, LedgerError, LedgerEvent,
    LedgerReader, PluginHook, TransferEvent,
};
pub use lp_types::{
    Address, Admin, AdminId, AdminKind, AdminUpdate, Amount, Clock, ManualClock, Pledge, PledgeId,
    PledgeState, SystemClock, Timestamp, TokenId,
};
pub use lp_vault::{
    Capability, CapabilityKind, Payment, PaymentId, PaymentStatus, VaultConfig, VaultError,
    VaultEvent,
};
