use lp_types::{Address, AdminId, AdminKind, Amount, PledgeId, PluginId};

/// Errors produced by ledger operations.
///
/// Every operation that returns an error leaves the ledger exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{caller} is not authorized to {action}")]
    Unauthorized { caller: Address, action: String },

    #[error("admin id 0 is reserved")]
    ZeroId,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Amount, available: Amount },

    #[error("depth limit of {limit} exceeded")]
    DepthExceeded { limit: usize },

    #[error("delegation chain limit of {limit} exceeded")]
    TooManyDelegates { limit: usize },

    #[error("project {0} is already canceled")]
    AlreadyCanceled(AdminId),

    #[error("project {0} is canceled")]
    ProjectCanceled(AdminId),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{id} is a {actual}, expected a {expected}")]
    WrongAdminKind {
        id: AdminId,
        expected: AdminKind,
        actual: AdminKind,
    },

    #[error("admin not found: {0}")]
    AdminNotFound(AdminId),

    #[error("pledge not found: {0}")]
    PledgeNotFound(PledgeId),

    #[error("plugin not found: {0}")]
    PluginNotFound(PluginId),

    #[error("plugin {plugin} rejected the transfer: {reason}")]
    PluginRejected { plugin: PluginId, reason: String },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub(crate) fn unauthorized(caller: &Address, action: impl Into<String>) -> Self {
        Self::Unauthorized {
            caller: *caller,
            action: action.into(),
        }
    }

    /// Returns `true` for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AdminNotFound(_) | Self::PledgeNotFound(_) | Self::PluginNotFound(_)
        )
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
