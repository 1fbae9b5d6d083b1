use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub connected: bool,
    pub address: Option<String>,
}

impl Connection {
    pub fn connected(address: String) -> Self {
        Self {
            connected: true,
            address: Some(address),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub owner_address: String,
    /// Decimal token amount, never base units.
    pub total_supply: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    #[serde(rename = "walletAddress")]
    RecipientAddress,
    #[serde(rename = "transferAmount")]
    TransferAmount,
    #[serde(rename = "burnAmount")]
    BurnAmount,
    #[serde(rename = "mintAmount")]
    MintAmount,
}

impl InputField {
    pub const ALL: [InputField; 4] = [
        InputField::RecipientAddress,
        InputField::TransferAmount,
        InputField::BurnAmount,
        InputField::MintAmount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            InputField::RecipientAddress => "walletAddress",
            InputField::TransferAmount => "transferAmount",
            InputField::BurnAmount => "burnAmount",
            InputField::MintAmount => "mintAmount",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for InputField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "walletAddress" | "wallet_address" | "recipient" | "recipientAddress" => {
                Ok(InputField::RecipientAddress)
            }
            "transferAmount" | "transfer_amount" => Ok(InputField::TransferAmount),
            "burnAmount" | "burn_amount" => Ok(InputField::BurnAmount),
            "mintAmount" | "mint_amount" => Ok(InputField::MintAmount),
            other => Err(format!("unknown input field: {other}")),
        }
    }
}

/// Raw form values as typed by the user. Nothing here is validated until submit.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingInput {
    #[serde(rename = "walletAddress")]
    pub recipient_address: String,
    pub transfer_amount: String,
    pub burn_amount: String,
    pub mint_amount: String,
}

impl PendingInput {
    pub fn get(&self, field: InputField) -> &str {
        match field {
            InputField::RecipientAddress => &self.recipient_address,
            InputField::TransferAmount => &self.transfer_amount,
            InputField::BurnAmount => &self.burn_amount,
            InputField::MintAmount => &self.mint_amount,
        }
    }

    pub fn set(&mut self, field: InputField, value: impl Into<String>) {
        let slot = match field {
            InputField::RecipientAddress => &mut self.recipient_address,
            InputField::TransferAmount => &mut self.transfer_amount,
            InputField::BurnAmount => &mut self.burn_amount,
            InputField::MintAmount => &mut self.mint_amount,
        };
        *slot = value.into();
    }

    pub fn clear(&mut self, field: InputField) {
        self.set(field, String::new());
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub hash: String,
    pub confirmed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Loading,
    Ready,
    Submitting,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    Transfer,
    Burn,
    Mint,
}

impl TokenAction {
    /// The form field holding this action's amount.
    pub fn amount_field(self) -> InputField {
        match self {
            TokenAction::Transfer => InputField::TransferAmount,
            TokenAction::Burn => InputField::BurnAmount,
            TokenAction::Mint => InputField::MintAmount,
        }
    }
}

impl fmt::Display for TokenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenAction::Transfer => f.write_str("transfer"),
            TokenAction::Burn => f.write_str("burn"),
            TokenAction::Mint => f.write_str("mint"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoWalletDetected,
    ConnectionRefused,
    InvalidAmount,
    InvalidAddress,
    ContractReadError,
    TransactionRejected,
    TransactionReverted,
    ConfirmationTimeout,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub message: String,
}

/// Everything the presentation layer renders.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub contract_address: String,
    pub connection: Connection,
    pub metadata: TokenMetadata,
    pub is_owner: bool,
    pub error: Option<ErrorView>,
    pub last_transaction: Option<TransactionResult>,
    pub inputs: PendingInput,
}
