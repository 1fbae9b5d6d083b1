use crate::modules::error::SessionError;
use crate::modules::protocol::Connection;
use crate::modules::rpc::{RpcClient, RpcError, TransactionRequest};
use alloy_primitives::{hex, Address, B256};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// The user's wallet: reveals authorized accounts and signs/submits transactions for them.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// May prompt the user for permission on first use.
    async fn request_accounts(&self) -> Result<Vec<String>, RpcError>;
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, RpcError>;
}

/// Wallet reached over JSON-RPC (an unlocked node, a signer proxy, ...).
pub struct HttpWallet {
    rpc: RpcClient,
    account: Mutex<Option<Address>>,
}

impl HttpWallet {
    pub fn new(rpc: RpcClient) -> Self {
        Self {
            rpc,
            account: Mutex::new(None),
        }
    }

    fn cached_account(&self) -> Option<Address> {
        self.account.lock().ok().and_then(|g| *g)
    }

    fn remember(&self, account: Option<Address>) {
        if let Ok(mut g) = self.account.lock() {
            *g = account;
        }
    }
}

#[async_trait]
impl Wallet for HttpWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, RpcError> {
        let accounts = self.rpc.accounts().await?;
        self.remember(accounts.first().and_then(|a| a.parse().ok()));
        Ok(accounts)
    }

    async fn send_transaction(&self, mut tx: TransactionRequest) -> Result<B256, RpcError> {
        if tx.from.is_none() {
            tx.from = match self.cached_account() {
                Some(a) => Some(a),
                None => {
                    let accounts = self.request_accounts().await?;
                    accounts.first().and_then(|a| a.parse().ok())
                }
            };
        }
        self.rpc.send_transaction(&tx).await
    }
}

pub fn parse_address(s: &str) -> Result<Address, SessionError> {
    let t = s.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .ok_or_else(|| SessionError::InvalidAddress(format!("missing 0x prefix: {s:?}")))?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SessionError::InvalidAddress(format!(
            "expected 40 hex digits: {s:?}"
        )));
    }
    digits
        .parse::<Address>()
        .map_err(|e| SessionError::InvalidAddress(format!("{s:?}: {e}")))
}

pub fn lowercase_address(address: &Address) -> String {
    hex::encode_prefixed(address)
}

/// Tracks which account the wallet has authorized for this session.
pub struct ConnectionManager {
    wallet: Option<Arc<dyn Wallet>>,
    connection: Connection,
}

impl ConnectionManager {
    pub fn new(wallet: Option<Arc<dyn Wallet>>) -> Self {
        Self {
            wallet,
            connection: Connection::default(),
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn address(&self) -> Option<&str> {
        self.connection.address.as_deref()
    }

    /// Safe to call repeatedly; each call re-reads the wallet's first account.
    pub async fn request_connection(&mut self) -> Result<Connection, SessionError> {
        let Some(wallet) = self.wallet.as_ref() else {
            warn!("no wallet detected");
            return Err(SessionError::NoWalletDetected);
        };

        let accounts = wallet
            .request_accounts()
            .await
            .map_err(|e| SessionError::ConnectionRefused(e.to_string()))?;
        let first = accounts
            .first()
            .ok_or_else(|| SessionError::ConnectionRefused("wallet returned no accounts".to_string()))?;
        let address = parse_address(first)
            .map_err(|e| SessionError::ConnectionRefused(format!("wallet returned {e}")))?;

        self.connection = Connection::connected(lowercase_address(&address));
        info!(account = ?self.connection.address, "account connected");
        Ok(self.connection.clone())
    }
}
