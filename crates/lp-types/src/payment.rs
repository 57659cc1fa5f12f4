use serde::{Deserialize, Serialize};

use crate::identity::{Address, PledgeId, TokenId};
use crate::pledge::Amount;

/// Reference handed from the ledger to the vault when a project withdraws.
///
/// `pledge` is the exclusive `Paying` pledge backing this payment; the vault
/// reports back against it when the payment is confirmed or canceled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub pledge: PledgeId,
    pub amount: Amount,
    pub token: TokenId,
    pub payee: Address,
}
