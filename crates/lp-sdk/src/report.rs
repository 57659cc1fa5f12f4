use serde::Serialize;

use lp_ledger::InvariantReport;
use lp_types::{Amount, TokenId};

/// Vault balance against the ledger's outstanding funds for one token.
///
/// Every unit the vault received is either still in the vault, gone through
/// the escape hatch, or paid out. The ledger's view of the first two is the
/// sum of its `Pledged` and `Paying` pledges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenReconciliation {
    pub token: TokenId,
    pub vault_balance: Amount,
    pub escaped: Amount,
    /// Sum of `Pledged` and `Paying` pledges in this token.
    pub outstanding: Amount,
}

impl TokenReconciliation {
    pub fn is_balanced(&self) -> bool {
        self.vault_balance.checked_add(self.escaped) == Some(self.outstanding)
    }
}

/// Combined result of [`crate::Pledging::verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub invariants: InvariantReport,
    pub tokens: Vec<TokenReconciliation>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.invariants.is_valid() && self.tokens.iter().all(TokenReconciliation::is_balanced)
    }

    pub fn unbalanced(&self) -> impl Iterator<Item = &TokenReconciliation> {
        self.tokens.iter().filter(|t| !t.is_balanced())
    }
}
