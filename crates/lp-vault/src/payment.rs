use std::fmt;

use serde::{Deserialize, Serialize};

use lp_types::{Address, Amount, PaymentRequest, PledgeId, TokenId};

/// Identifier of a vault payment. Ids start at 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

impl PaymentId {
    pub fn index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|i| i as usize)
    }

    pub fn from_index(index: usize) -> Self {
        Self(index as u64 + 1)
    }
}

impl fmt::Debug for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentId({})", self.0)
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// A payout the vault has been asked to make.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// The `Paying` pledge backing this payment.
    pub pledge: PledgeId,
    pub token: TokenId,
    pub amount: Amount,
    pub payee: Address,
    pub status: PaymentStatus,
}

impl Payment {
    pub(crate) fn pending(id: PaymentId, request: &PaymentRequest) -> Self {
        Self {
            id,
            pledge: request.pledge,
            token: request.token.clone(),
            amount: request.amount,
            payee: request.payee,
            status: PaymentStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}
