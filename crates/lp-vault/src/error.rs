use lp_types::{Address, Amount, TokenId};

use crate::payment::PaymentId;

/// Errors produced by vault operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("{caller} is not authorized to {action}")]
    Unauthorized { caller: Address, action: String },

    #[error("insufficient {token} balance: requested {requested}, available {available}")]
    InsufficientFunds {
        token: TokenId,
        requested: Amount,
        available: Amount,
    },

    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("configuration error: {0}")]
    Config(String),
}

impl VaultError {
    pub(crate) fn unauthorized(caller: &Address, action: impl Into<String>) -> Self {
        Self::Unauthorized {
            caller: *caller,
            action: action.into(),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
