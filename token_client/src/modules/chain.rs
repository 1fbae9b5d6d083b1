use crate::modules::error::SessionError;
use crate::modules::protocol::{TokenMetadata, TransactionResult};
use crate::modules::rpc::{BlockTag, CallRequest, RpcClient, RpcError, TransactionRequest, TxReceipt};
use crate::modules::units::{to_base_units, to_decimal_string};
use crate::modules::wallet::{parse_address, Wallet};
use alloy_primitives::{address, hex, Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Deployed token instance this client talks to.
pub const CONTRACT_ADDRESS: Address = address!("8b8f781Dd984DC2b0335A2d9Db6004B7A80d69a9");

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(600);

sol! {
    #[allow(missing_docs)]
    interface IToken {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function owner() external view returns (address);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function burn(uint256 amount) external;
        function mint(address to, uint256 amount) external;
    }
}

/// Read-only access to chain state.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn call(&self, req: CallRequest, block: BlockTag) -> Result<Bytes, RpcError>;
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, RpcError>;
}

#[async_trait]
impl ChainProvider for RpcClient {
    async fn call(&self, req: CallRequest, block: BlockTag) -> Result<Bytes, RpcError> {
        RpcClient::call(self, &req, block).await
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        RpcClient::transaction_receipt(self, hash).await
    }
}

pub struct ChainClient {
    provider: Arc<dyn ChainProvider>,
    wallet: Option<Arc<dyn Wallet>>,
    contract: Address,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl ChainClient {
    pub fn new(provider: Arc<dyn ChainProvider>, wallet: Option<Arc<dyn Wallet>>) -> Self {
        Self {
            provider,
            wallet,
            contract: CONTRACT_ADDRESS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn with_confirmation(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirmation_timeout = timeout;
        self
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub async fn read_metadata(&self) -> Result<TokenMetadata, SessionError> {
        let name = self.read(IToken::nameCall {}).await?._0;
        let symbol = self.read(IToken::symbolCall {}).await?._0;
        let owner = self.read(IToken::ownerCall {}).await?._0;
        let supply = self.read(IToken::totalSupplyCall {}).await?._0;

        Ok(TokenMetadata {
            name,
            symbol,
            owner_address: owner.to_checksum(None),
            total_supply: to_decimal_string(supply),
        })
    }

    pub async fn read_owner(&self) -> Result<String, SessionError> {
        let owner = self.read(IToken::ownerCall {}).await?._0;
        Ok(owner.to_checksum(None))
    }

    pub async fn balance_of(&self, account: &str) -> Result<String, SessionError> {
        let account = parse_address(account)?;
        let balance = self.read(IToken::balanceOfCall { account }).await?._0;
        Ok(to_decimal_string(balance))
    }

    pub async fn transfer(&self, to: &str, amount: &str) -> Result<TransactionResult, SessionError> {
        let to = parse_address(to)?;
        let amount = to_base_units(amount)?;
        self.transact(IToken::transferCall { to, amount }).await
    }

    pub async fn burn(&self, amount: &str) -> Result<TransactionResult, SessionError> {
        let amount = to_base_units(amount)?;
        self.transact(IToken::burnCall { amount }).await
    }

    /// Ownership is enforced by the contract; a non-owner gets a revert, not a local error.
    pub async fn mint(&self, to: &str, amount: &str) -> Result<TransactionResult, SessionError> {
        let to = parse_address(to)?;
        let amount = to_base_units(amount)?;
        self.transact(IToken::mintCall { to, amount }).await
    }

    async fn read<C: SolCall + Send>(&self, call: C) -> Result<C::Return, SessionError> {
        let req = CallRequest {
            from: None,
            to: self.contract,
            data: call.abi_encode().into(),
        };
        let out = self
            .provider
            .call(req, BlockTag::Latest)
            .await
            .map_err(|e| SessionError::ContractReadError(format!("{}: {e}", C::SIGNATURE)))?;
        C::abi_decode_returns(&out, true)
            .map_err(|e| SessionError::ContractReadError(format!("{}: {e}", C::SIGNATURE)))
    }

    async fn transact<C: SolCall + Send>(&self, call: C) -> Result<TransactionResult, SessionError> {
        let wallet = self.wallet.as_ref().ok_or(SessionError::NoWalletDetected)?;
        let data: Bytes = call.abi_encode().into();
        let tx = TransactionRequest {
            from: None,
            to: self.contract,
            data: data.clone(),
        };

        let hash = wallet
            .send_transaction(tx)
            .await
            .map_err(submit_error)?;
        let hash_hex = hex::encode_prefixed(hash);
        info!(method = C::SIGNATURE, hash = %hash_hex, "transaction submitted");

        let receipt = self.wait_for_receipt(hash).await?;
        if !receipt.succeeded {
            let reason = self.replay_for_reason(&receipt, data).await;
            warn!(hash = %hash_hex, ?reason, "transaction reverted");
            return Err(SessionError::TransactionReverted {
                hash: Some(hash_hex),
                reason,
            });
        }

        info!(hash = %hash_hex, block = ?receipt.block_number, "transaction confirmed");
        Ok(TransactionResult {
            hash: hash_hex,
            confirmed: true,
        })
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt, SessionError> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            match self.provider.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                // The transaction is already out; keep polling through provider hiccups.
                Err(e) => warn!(error = %e, "receipt poll failed"),
            }
            if Instant::now() + self.poll_interval > deadline {
                return Err(SessionError::ConfirmationTimeout {
                    hash: hex::encode_prefixed(hash),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn replay_for_reason(&self, receipt: &TxReceipt, data: Bytes) -> Option<String> {
        let block = receipt.block_number.map(BlockTag::Number)?;
        let req = CallRequest {
            from: receipt.from,
            to: self.contract,
            data,
        };
        match self.provider.call(req, block).await {
            Ok(_) => None,
            Err(e) => e.revert_reason(),
        }
    }
}

fn submit_error(e: RpcError) -> SessionError {
    if e.is_user_rejection() {
        SessionError::TransactionRejected(e.to_string())
    } else if e.is_revert() {
        SessionError::TransactionReverted {
            hash: None,
            reason: e.revert_reason(),
        }
    } else {
        SessionError::TransactionRejected(e.to_string())
    }
}
