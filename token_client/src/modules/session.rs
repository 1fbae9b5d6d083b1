use crate::modules::error::SessionError;
use crate::modules::protocol::{
    Connection, PendingInput, SessionPhase, SessionSnapshot, TokenMetadata, TransactionResult,
};

/// Last-known view of the wallet and the token. Only written through the setters below.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    phase: SessionPhase,
    connection: Connection,
    metadata: TokenMetadata,
    error: Option<SessionError>,
    last_transaction: Option<TransactionResult>,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn last_transaction(&self) -> Option<&TransactionResult> {
        self.last_transaction.as_ref()
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub fn set_connection(&mut self, connection: Connection) {
        self.connection = connection;
    }

    pub fn set_metadata(&mut self, metadata: TokenMetadata) {
        self.metadata = metadata;
    }

    pub fn set_total_supply(&mut self, total_supply: String) {
        self.metadata.total_supply = total_supply;
    }

    pub fn set_error(&mut self, error: SessionError) {
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_last_transaction(&mut self, tx: TransactionResult) {
        self.last_transaction = Some(tx);
    }

    /// Owner check is case-insensitive and never true without a connected wallet.
    pub fn is_owner(&self, address: &str) -> bool {
        if !self.connection.connected {
            return false;
        }
        let owner = self.metadata.owner_address.trim();
        let address = address.trim();
        !owner.is_empty() && owner.eq_ignore_ascii_case(address)
    }

    /// Privilege of the connected account.
    pub fn connected_is_owner(&self) -> bool {
        self.connection
            .address
            .as_deref()
            .is_some_and(|a| self.is_owner(a))
    }

    pub fn snapshot(&self, contract_address: &str, inputs: &PendingInput) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            contract_address: contract_address.to_string(),
            connection: self.connection.clone(),
            metadata: self.metadata.clone(),
            is_owner: self.connected_is_owner(),
            error: self.error.as_ref().map(SessionError::view),
            last_transaction: self.last_transaction.clone(),
            inputs: inputs.clone(),
        }
    }
}
