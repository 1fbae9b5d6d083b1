use crate::modules::chain::ChainClient;
use crate::modules::error::SessionError;
use crate::modules::protocol::{
    InputField, PendingInput, SessionPhase, SessionSnapshot, TokenAction, TokenMetadata,
    TransactionResult,
};
use crate::modules::session::SessionState;
use crate::modules::units::to_base_units;
use crate::modules::wallet::ConnectionManager;
use tokio::sync::watch;
use tracing::{info, warn};

/// Drives one session: startup, user actions, and publication of the resulting state.
///
/// Every chain call is awaited in order. A write's confirmation always completes
/// before the supply refresh that follows it, so the published total supply is
/// never ahead of the chain.
pub struct Orchestrator {
    connections: ConnectionManager,
    chain: ChainClient,
    state: SessionState,
    inputs: PendingInput,
    contract_address: String,
    publisher: watch::Sender<SessionSnapshot>,
}

impl Orchestrator {
    pub fn new(connections: ConnectionManager, chain: ChainClient) -> Self {
        let contract_address = chain.contract_address().to_checksum(None);
        let state = SessionState::default();
        let inputs = PendingInput::default();
        let (publisher, _) = watch::channel(state.snapshot(&contract_address, &inputs));
        Self {
            connections,
            chain,
            state,
            inputs,
            contract_address,
            publisher,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.publisher.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot(&self.contract_address, &self.inputs)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn inputs(&self) -> &PendingInput {
        &self.inputs
    }

    pub fn chain(&self) -> &ChainClient {
        &self.chain
    }

    pub fn is_owner(&self) -> bool {
        self.state.connected_is_owner()
    }

    pub fn set_input(&mut self, field: InputField, value: impl Into<String>) {
        self.inputs.set(field, value);
        self.publish();
    }

    /// Run once on load. Metadata is fetched even when no wallet connects.
    pub async fn initialize(&mut self) {
        self.state.clear_error();
        self.enter(SessionPhase::Connecting);
        match self.connections.request_connection().await {
            Ok(connection) => self.state.set_connection(connection),
            Err(e) => self.record(e),
        }

        self.enter(SessionPhase::Loading);
        match self.chain.read_metadata().await {
            Ok(metadata) => {
                info!(name = %metadata.name, symbol = %metadata.symbol, supply = %metadata.total_supply, "token metadata loaded");
                self.state.set_metadata(metadata);
            }
            Err(e) => {
                self.state.set_metadata(TokenMetadata::default());
                self.record(e);
            }
        }
        self.enter(SessionPhase::Ready);
    }

    /// User-initiated (re)connect.
    pub async fn connect(&mut self) {
        self.state.clear_error();
        match self.connections.request_connection().await {
            Ok(connection) => self.state.set_connection(connection),
            Err(e) => self.record(e),
        }
        self.publish();
    }

    /// Re-read all metadata. On failure the last good metadata stays.
    pub async fn refresh(&mut self) {
        self.state.clear_error();
        match self.chain.read_metadata().await {
            Ok(metadata) => self.state.set_metadata(metadata),
            Err(e) => self.record(e),
        }
        self.publish();
    }

    pub async fn submit_transfer(
        &mut self,
        recipient: &str,
        amount: &str,
    ) -> Result<TransactionResult, SessionError> {
        self.inputs.set(InputField::RecipientAddress, recipient);
        self.inputs.set(InputField::TransferAmount, amount);
        self.submit(TokenAction::Transfer).await
    }

    pub async fn submit_burn(&mut self, amount: &str) -> Result<TransactionResult, SessionError> {
        self.inputs.set(InputField::BurnAmount, amount);
        self.submit(TokenAction::Burn).await
    }

    pub async fn submit_mint(&mut self, amount: &str) -> Result<TransactionResult, SessionError> {
        self.inputs.set(InputField::MintAmount, amount);
        self.submit(TokenAction::Mint).await
    }

    /// Submit `action` using the current form values.
    ///
    /// Failures are recorded in the session and also returned. Metadata is left
    /// untouched unless the write confirmed.
    pub async fn submit(&mut self, action: TokenAction) -> Result<TransactionResult, SessionError> {
        self.state.clear_error();

        let amount = self.inputs.get(action.amount_field()).trim().to_string();
        if amount.is_empty() {
            return Err(self.reject(SessionError::InvalidAmount(format!(
                "{action} amount is required"
            ))));
        }
        let recipient = self.inputs.get(InputField::RecipientAddress).trim().to_string();
        if action == TokenAction::Transfer && recipient.is_empty() {
            return Err(self.reject(SessionError::InvalidAddress(
                "recipient address is required".to_string(),
            )));
        }

        self.enter(SessionPhase::Submitting);
        info!(%action, %amount, "submitting transaction");

        let outcome = match action {
            TokenAction::Transfer => self.chain.transfer(&recipient, &amount).await,
            TokenAction::Burn => self.chain.burn(&amount).await,
            TokenAction::Mint => self.mint_to_owner(&amount).await,
        };

        match outcome {
            Ok(tx) => {
                self.state.set_last_transaction(tx.clone());
                self.inputs.clear(action.amount_field());
                match self.chain.read_metadata().await {
                    Ok(metadata) => self.state.set_total_supply(metadata.total_supply),
                    Err(e) => self.record(e),
                }
                self.enter(SessionPhase::Ready);
                Ok(tx)
            }
            Err(e) => {
                self.record(e.clone());
                self.enter(SessionPhase::Ready);
                Err(e)
            }
        }
    }

    async fn mint_to_owner(&self, amount: &str) -> Result<TransactionResult, SessionError> {
        // A bad amount must fail before the owner lookup goes out.
        to_base_units(amount)?;
        let owner = self.chain.read_owner().await?;
        self.chain.mint(&owner, amount).await
    }

    fn reject(&mut self, e: SessionError) -> SessionError {
        self.record(e.clone());
        self.publish();
        e
    }

    fn record(&mut self, e: SessionError) {
        warn!(kind = ?e.kind(), error = %e, "session error");
        self.state.set_error(e);
    }

    fn enter(&mut self, phase: SessionPhase) {
        self.state.set_phase(phase);
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot());
    }
}
