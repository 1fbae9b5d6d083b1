#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{Revert, SolCall, SolError, SolValue};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use token_client::chain::{ChainClient, ChainProvider, IToken};
use token_client::orchestrator::Orchestrator;
use token_client::rpc::{BlockTag, CallRequest, RpcError, TransactionRequest, TxReceipt};
use token_client::wallet::{ConnectionManager, Wallet};
use tokio::sync::Notify;

pub const OWNER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const OTHER: &str = "0x000000000000000000000000000000000000bbbb";
pub const ONE_TOKEN: u64 = 1_000_000_000_000_000_000;

pub fn addr(s: &str) -> Address {
    s.parse().expect("test address")
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    Accept,
    UserRejects,
    RevertOnEstimate,
}

struct PendingTx {
    method: &'static str,
    call: Vec<u8>,
    from: Address,
}

#[derive(Default)]
struct Ledger {
    log: Vec<String>,
    supply: U256,
    pending: HashMap<B256, PendingTx>,
    mined: HashMap<B256, TxReceipt>,
    sent: Vec<TransactionRequest>,
    next_hash: u8,
}

/// In-memory token node acting as both the read provider and the wallet.
pub struct MockNode {
    ledger: Mutex<Ledger>,
    accounts: Vec<String>,
    owner: Address,
    pub fail_reads: Mutex<bool>,
    pub send_mode: Mutex<SendMode>,
    /// Receipt polls answered with "not yet mined" before the receipt appears.
    pub polls_before_receipt: Mutex<usize>,
    pub gate: Option<Arc<Notify>>,
}

impl MockNode {
    pub fn new(connected_as: Option<&str>) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                supply: U256::from(ONE_TOKEN),
                ..Default::default()
            }),
            accounts: connected_as.map(|a| vec![a.to_string()]).unwrap_or_default(),
            owner: addr(OWNER),
            fail_reads: Mutex::new(false),
            send_mode: Mutex::new(SendMode::Accept),
            polls_before_receipt: Mutex::new(0),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.ledger.lock().unwrap().log.clone()
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.ledger.lock().unwrap().sent.clone()
    }

    pub fn supply(&self) -> U256 {
        self.ledger.lock().unwrap().supply
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log().iter().filter(|e| e.as_str() == entry).count()
    }

    fn sender(&self) -> Address {
        self.accounts
            .first()
            .map(|a| addr(a))
            .unwrap_or(Address::ZERO)
    }

    fn push(&self, entry: String) {
        self.ledger.lock().unwrap().log.push(entry);
    }
}

pub fn method_of(data: &[u8]) -> &'static str {
    let sel: [u8; 4] = data[..4].try_into().expect("selector");
    if sel == IToken::nameCall::SELECTOR {
        "name"
    } else if sel == IToken::symbolCall::SELECTOR {
        "symbol"
    } else if sel == IToken::ownerCall::SELECTOR {
        "owner"
    } else if sel == IToken::totalSupplyCall::SELECTOR {
        "totalSupply"
    } else if sel == IToken::balanceOfCall::SELECTOR {
        "balanceOf"
    } else if sel == IToken::transferCall::SELECTOR {
        "transfer"
    } else if sel == IToken::burnCall::SELECTOR {
        "burn"
    } else if sel == IToken::mintCall::SELECTOR {
        "mint"
    } else {
        "unknown"
    }
}

fn revert(reason: &str) -> RpcError {
    let data = Revert {
        reason: reason.to_string(),
    }
    .abi_encode();
    RpcError::Rpc {
        code: 3,
        message: "execution reverted".to_string(),
        data: Some(json!(alloy_primitives::hex::encode_prefixed(data))),
    }
}

#[async_trait]
impl ChainProvider for MockNode {
    async fn call(&self, req: CallRequest, block: BlockTag) -> Result<Bytes, RpcError> {
        let method = method_of(&req.data);
        if block != BlockTag::Latest {
            // Replay of a mined transaction to recover the revert reason.
            self.push(format!("replay:{method}"));
            return Err(revert("Ownable: caller is not the owner"));
        }
        self.push(format!("read:{method}"));
        if *self.fail_reads.lock().unwrap() {
            return Err(RpcError::Parse("connection reset".to_string()));
        }
        let supply = self.supply();
        let out = match method {
            "name" => ("TestCoin".to_string(),).abi_encode_params(),
            "symbol" => ("TST".to_string(),).abi_encode_params(),
            "owner" => (self.owner,).abi_encode_params(),
            "totalSupply" => (supply,).abi_encode_params(),
            "balanceOf" => (U256::from(ONE_TOKEN / 2),).abi_encode_params(),
            other => panic!("unexpected read {other}"),
        };
        Ok(out.into())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        {
            let mut polls = self.polls_before_receipt.lock().unwrap();
            if *polls > 0 {
                *polls -= 1;
                self.push("receipt:pending".to_string());
                return Ok(None);
            }
        }

        let mut ledger = self.ledger.lock().unwrap();
        if let Some(r) = ledger.mined.get(&hash) {
            return Ok(Some(r.clone()));
        }
        let Some(tx) = ledger.pending.remove(&hash) else {
            return Ok(None);
        };

        let succeeded = !(tx.method == "mint" && tx.from != self.owner);
        if succeeded {
            match tx.method {
                "burn" => {
                    let c = IToken::burnCall::abi_decode(&tx.call, true).unwrap();
                    ledger.supply -= c.amount;
                }
                "mint" => {
                    let c = IToken::mintCall::abi_decode(&tx.call, true).unwrap();
                    ledger.supply += c.amount;
                }
                _ => {}
            }
        }
        let receipt = TxReceipt {
            transaction_hash: hash,
            block_number: Some(7),
            from: Some(tx.from),
            succeeded,
        };
        ledger.log.push(format!("receipt:{}", tx.method));
        ledger.mined.insert(hash, receipt.clone());
        Ok(Some(receipt))
    }
}

#[async_trait]
impl Wallet for MockNode {
    async fn request_accounts(&self) -> Result<Vec<String>, RpcError> {
        self.push("wallet:accounts".to_string());
        Ok(self.accounts.clone())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, RpcError> {
        let method = method_of(&tx.data);
        self.push(format!("send:{method}"));
        if let Some(gate) = self.gate.as_ref() {
            gate.notified().await;
        }

        let mode = *self.send_mode.lock().unwrap();
        match mode {
            SendMode::UserRejects => {
                return Err(RpcError::Rpc {
                    code: 4001,
                    message: "User denied transaction signature.".to_string(),
                    data: None,
                })
            }
            SendMode::RevertOnEstimate => return Err(revert("ERC20: burn amount exceeds balance")),
            SendMode::Accept => {}
        }

        let mut ledger = self.ledger.lock().unwrap();
        ledger.next_hash += 1;
        let hash = B256::with_last_byte(ledger.next_hash);
        ledger.sent.push(tx.clone());
        ledger.pending.insert(
            hash,
            PendingTx {
                method,
                call: tx.data.to_vec(),
                from: tx.from.unwrap_or_else(|| self.sender()),
            },
        );
        Ok(hash)
    }
}

pub fn orchestrator_for(node: &Arc<MockNode>, with_wallet: bool) -> Orchestrator {
    orchestrator_with(node, with_wallet, Duration::from_millis(5), Duration::from_secs(10))
}

pub fn orchestrator_with(
    node: &Arc<MockNode>,
    with_wallet: bool,
    poll_interval: Duration,
    confirmation_timeout: Duration,
) -> Orchestrator {
    let provider: Arc<dyn ChainProvider> = node.clone();
    let wallet: Option<Arc<dyn Wallet>> = if with_wallet {
        Some(node.clone())
    } else {
        None
    };
    let chain = ChainClient::new(provider, wallet.clone())
        .with_confirmation(poll_interval, confirmation_timeout);
    Orchestrator::new(ConnectionManager::new(wallet), chain)
}
