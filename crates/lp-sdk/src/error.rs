use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("ledger error: {0}")]
    Ledger(#[from] lp_ledger::LedgerError),

    #[error("vault error: {0}")]
    Vault(#[from] lp_vault::VaultError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
