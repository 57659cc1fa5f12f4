//! Foundation types for the liquid pledging ledger.
//!
//! Every other `lp-*` crate depends on `lp-types`.
//!
//! # Key Types
//!
//! - [`AdminId`], [`PledgeId`], [`PluginId`]: 1-based arena identifiers
//! - [`Address`]: caller identity checked against admin controllers
//! - [`TokenId`]: per-token asset identifier
//! - [`Admin`] / [`AdminKind`]: givers, delegates, and projects
//! - [`Pledge`] / [`PledgeShape`] / [`PledgeState`]: pledge rows
//! - [`Timestamp`] / [`Clock`]: logical time used for commit deadlines
//! - [`PaymentRequest`]: the ledger-to-vault payment reference

pub mod admin;
pub mod error;
pub mod identity;
pub mod payment;
pub mod pledge;
pub mod temporal;

pub use admin::{Admin, AdminKind, AdminUpdate};
pub use error::TypeError;
pub use identity::{Address, AdminId, PledgeId, PluginId, TokenId};
pub use payment::PaymentRequest;
pub use pledge::{Amount, Pledge, PledgeShape, PledgeState};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
