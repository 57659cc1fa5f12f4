use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use lp_types::{Address, Amount};

/// Permission to perform a settlement action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Confirm pending payments. `max_amount` restricts the grant to
    /// payments no larger than the limit.
    ConfirmPayment { max_amount: Option<Amount> },
    CancelPayment,
    SetAutopay,
}

/// The kind of a capability, without its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    ConfirmPayment,
    CancelPayment,
    SetAutopay,
}

impl Capability {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::ConfirmPayment { .. } => CapabilityKind::ConfirmPayment,
            Self::CancelPayment => CapabilityKind::CancelPayment,
            Self::SetAutopay => CapabilityKind::SetAutopay,
        }
    }

    /// Returns `true` if this grant covers confirming `amount`.
    pub fn covers_confirm(&self, amount: Amount) -> bool {
        match self {
            Self::ConfirmPayment { max_amount: None } => true,
            Self::ConfirmPayment {
                max_amount: Some(limit),
            } => amount <= *limit,
            _ => false,
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConfirmPayment => "confirm_payment",
            Self::CancelPayment => "cancel_payment",
            Self::SetAutopay => "set_autopay",
        };
        f.write_str(s)
    }
}

/// Capabilities held per address. At most one grant of each kind; granting
/// again replaces the previous grant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    grants: BTreeMap<Address, BTreeMap<CapabilityKind, Capability>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, to: Address, capability: Capability) {
        self.grants
            .entry(to)
            .or_default()
            .insert(capability.kind(), capability);
    }

    /// Remove a grant. Returns `false` if it was not held.
    pub fn revoke(&mut self, from: &Address, kind: CapabilityKind) -> bool {
        let Some(held) = self.grants.get_mut(from) else {
            return false;
        };
        let removed = held.remove(&kind).is_some();
        if held.is_empty() {
            self.grants.remove(from);
        }
        removed
    }

    pub fn holds(&self, who: &Address, kind: CapabilityKind) -> bool {
        self.grants
            .get(who)
            .is_some_and(|held| held.contains_key(&kind))
    }

    pub fn can_confirm(&self, who: &Address, amount: Amount) -> bool {
        self.grants
            .get(who)
            .and_then(|held| held.get(&CapabilityKind::ConfirmPayment))
            .is_some_and(|cap| cap.covers_confirm(amount))
    }

    /// Every grant held by `who`.
    pub fn of(&self, who: &Address) -> Vec<Capability> {
        self.grants
            .get(who)
            .map(|held| held.values().copied().collect())
            .unwrap_or_default()
    }
}
