use alloy_primitives::{Address, Bytes, B256};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// Geth-style "execution reverted" error code.
pub const EXECUTION_REVERTED_CODE: i64 = 3;
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc request failed: status={status} body={body}")]
    BadStatus { status: StatusCode, body: String },
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("rpc response parse failed: {0}")]
    Parse(String),
}

impl RpcError {
    pub fn is_user_rejection(&self) -> bool {
        match self {
            RpcError::Rpc { code, message, .. } => {
                let m = message.to_ascii_lowercase();
                *code == USER_REJECTED_CODE || m.contains("user denied") || m.contains("user rejected")
            }
            _ => false,
        }
    }

    pub fn is_revert(&self) -> bool {
        match self {
            RpcError::Rpc { code, message, .. } => {
                *code == EXECUTION_REVERTED_CODE
                    || message.to_ascii_lowercase().contains("execution reverted")
            }
            _ => false,
        }
    }

    pub fn is_method_not_found(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == METHOD_NOT_FOUND_CODE)
    }

    /// Best-effort revert reason from either the error data or the message text.
    pub fn revert_reason(&self) -> Option<String> {
        let RpcError::Rpc { message, data, .. } = self else {
            return None;
        };
        if let Some(reason) = data.as_ref().and_then(revert_data_hex).and_then(|hex| {
            hex.parse::<Bytes>()
                .ok()
                .and_then(|b| alloy_sol_types::decode_revert_reason(&b))
        }) {
            return Some(reason);
        }
        let lower = message.to_ascii_lowercase();
        let idx = lower.find("execution reverted")?;
        let rest = message[idx + "execution reverted".len()..]
            .trim_start_matches(':')
            .trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }
}

// Nodes disagree on where revert bytes live: a bare hex string or `{ "data": "0x..." }`.
fn revert_data_hex(data: &Value) -> Option<&str> {
    match data {
        Value::String(s) if s.starts_with("0x") => Some(s.as_str()),
        Value::Object(map) => map.get("data").and_then(revert_data_hex),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl BlockTag {
    fn to_param(self) -> Value {
        match self {
            BlockTag::Latest => json!("latest"),
            BlockTag::Number(n) => json!(format!("0x{n:x}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub from: Option<Address>,
    pub succeeded: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    block_number: Option<String>,
    from: Option<Address>,
    status: Option<String>,
}

impl TryFrom<RawReceipt> for TxReceipt {
    type Error = RpcError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let block_number = raw.block_number.as_deref().map(parse_quantity).transpose()?;
        // Pre-Byzantium receipts carry no status; treat them as included.
        let succeeded = match raw.status.as_deref() {
            Some(s) => parse_quantity(s)? == 1,
            None => true,
        };
        Ok(TxReceipt {
            transaction_hash: raw.transaction_hash,
            block_number,
            from: raw.from,
            succeeded,
        })
    }
}

pub fn parse_quantity(s: &str) -> Result<u64, RpcError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Parse(format!("quantity without 0x prefix: {s:?}")))?;
    u64::from_str_radix(digits, 16).map_err(|e| RpcError::Parse(format!("bad quantity {s:?}: {e}")))
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    data: Option<Value>,
}

fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, RpcError> {
    let resp: RpcResponse =
        serde_json::from_str(body).map_err(|e| RpcError::Parse(format!("{e}: {body}")))?;
    if let Some(err) = resp.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }
    serde_json::from_value(resp.result.unwrap_or(Value::Null))
        .map_err(|e| RpcError::Parse(e.to_string()))
}

/// Minimal JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, url = %self.url, "rpc request");

        let resp = self.http.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            // JSON-RPC servers commonly return error envelopes with non-2xx codes.
            if let Ok(RpcResponse { error: Some(err), .. }) = serde_json::from_str(&text) {
                return Err(RpcError::Rpc {
                    code: err.code,
                    message: err.message,
                    data: err.data,
                });
            }
            return Err(RpcError::BadStatus { status, body: text });
        }
        decode_response(&text)
    }

    pub async fn call(&self, req: &CallRequest, block: BlockTag) -> Result<Bytes, RpcError> {
        self.request("eth_call", json!([req, block.to_param()])).await
    }

    pub async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        let raw: Option<RawReceipt> = self.request("eth_getTransactionReceipt", json!([hash])).await?;
        raw.map(TxReceipt::try_from).transpose()
    }

    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, RpcError> {
        self.request("eth_sendTransaction", json!([tx])).await
    }

    pub async fn accounts(&self) -> Result<Vec<String>, RpcError> {
        match self.request("eth_requestAccounts", json!([])).await {
            Err(e) if e.is_method_not_found() => self.request("eth_accounts", json!([])).await,
            other => other,
        }
    }
}
