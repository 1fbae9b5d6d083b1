use crate::modules::protocol::{ErrorKind, ErrorView};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Install a MetaMask wallet to get our token.")]
    NoWalletDetected,
    #[error("wallet refused the connection: {0}")]
    ConnectionRefused(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("contract read failed: {0}")]
    ContractReadError(String),
    #[error("transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("transaction reverted{}", revert_suffix(.hash, .reason))]
    TransactionReverted {
        hash: Option<String>,
        reason: Option<String>,
    },
    #[error("transaction {hash} was not confirmed in time")]
    ConfirmationTimeout { hash: String },
}

fn revert_suffix(hash: &Option<String>, reason: &Option<String>) -> String {
    let mut out = String::new();
    if let Some(h) = hash {
        out.push_str(&format!(" ({h})"));
    }
    if let Some(r) = reason {
        out.push_str(&format!(": {r}"));
    }
    out
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoWalletDetected => ErrorKind::NoWalletDetected,
            SessionError::ConnectionRefused(_) => ErrorKind::ConnectionRefused,
            SessionError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            SessionError::InvalidAddress(_) => ErrorKind::InvalidAddress,
            SessionError::ContractReadError(_) => ErrorKind::ContractReadError,
            SessionError::TransactionRejected(_) => ErrorKind::TransactionRejected,
            SessionError::TransactionReverted { .. } => ErrorKind::TransactionReverted,
            SessionError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
        }
    }

    pub fn view(&self) -> ErrorView {
        ErrorView {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<&SessionError> for ErrorView {
    fn from(e: &SessionError) -> Self {
        e.view()
    }
}
