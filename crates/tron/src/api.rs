//! Wire types for the Tron HTTP wallet API (`/wallet/*`, `/walletsolidity/*`).
//!
//! All requests are issued with `visible=true`, so addresses travel as
//! base58check strings. Absent fields default to zero/empty; nodes omit
//! zero-valued fields from JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Flat bandwidth charge per attached signature.
pub const SIGNATURE_PLACEHOLDER_BYTES: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCode {
    Bandwidth,
    Energy,
}

impl ResourceCode {
    /// Parameter value expected by `freezebalancev2` / `delegateresource`.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceCode::Bandwidth => "BANDWIDTH",
            ResourceCode::Energy => "ENERGY",
        }
    }
}

impl std::fmt::Display for ResourceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceCode::Bandwidth => "bandwidth",
            ResourceCode::Energy => "energy",
        })
    }
}

/// `/wallet/getaccount`. Nodes answer `{}` for addresses that do not exist
/// on-chain; `exists()` distinguishes that from an activated account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub create_time: i64,
}

impl Account {
    pub fn exists(&self) -> bool {
        !self.address.is_empty() || self.create_time != 0 || self.balance != 0
    }
}

/// `/wallet/getaccountresource`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AccountResourceMessage {
    #[serde(default, rename = "freeNetUsed")]
    pub free_net_used: i64,
    #[serde(default, rename = "freeNetLimit")]
    pub free_net_limit: i64,
    #[serde(default, rename = "NetUsed")]
    pub net_used: i64,
    #[serde(default, rename = "NetLimit")]
    pub net_limit: i64,
    #[serde(default, rename = "TotalNetLimit")]
    pub total_net_limit: i64,
    #[serde(default, rename = "TotalNetWeight")]
    pub total_net_weight: i64,
    #[serde(default, rename = "EnergyUsed")]
    pub energy_used: i64,
    #[serde(default, rename = "EnergyLimit")]
    pub energy_limit: i64,
    #[serde(default, rename = "TotalEnergyLimit")]
    pub total_energy_limit: i64,
    #[serde(default, rename = "TotalEnergyWeight")]
    pub total_energy_weight: i64,
}

/// `/wallet/getchainparameters`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainParameters {
    #[serde(default, rename = "chainParameter")]
    pub chain_parameter: Vec<ChainParameter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainParameter {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: i64,
}

/// A transaction as built by the node and broadcast back to it. `raw_data`
/// is kept opaque; the node is the authority on its protobuf encoding and
/// `raw_data_hex` carries the exact bytes that get signed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, rename = "txID")]
    pub tx_id: String,
    #[serde(default)]
    pub raw_data: serde_json::Value,
    #[serde(default)]
    pub raw_data_hex: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl Transaction {
    pub fn has_raw(&self) -> bool {
        !self.raw_data_hex.is_empty()
    }

    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.raw_data_hex).context("decode raw_data_hex")
    }

    /// Serialized length of the would-be signed transaction: raw bytes plus
    /// a flat placeholder per signature. This is the bandwidth a broadcast
    /// will consume.
    pub fn size_with_signatures(&self, signatures: u64) -> Result<u64> {
        let raw = self.raw_bytes()?;
        Ok(raw.len() as u64 + signatures * SIGNATURE_PLACEHOLDER_BYTES)
    }
}

/// `/wallet/triggerconstantcontract`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerConstantResult {
    #[serde(default)]
    pub result: TriggerReturn,
    #[serde(default)]
    pub energy_used: i64,
    #[serde(default)]
    pub constant_result: Vec<String>,
    #[serde(default)]
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerReturn {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub message: String,
}

/// `/wallet/broadcasttransaction`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastResult {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub txid: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl BroadcastResult {
    /// Node rejection messages arrive hex-encoded; decode best-effort.
    pub fn decoded_message(&self) -> String {
        match hex::decode(&self.message) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => self.message.clone(),
        }
    }
}

/// `/wallet/gettransactioninfobyid`. Nodes answer `{}` while unconfirmed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: i64,
    #[serde(default)]
    pub receipt: TransactionReceipt,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionReceipt {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub energy_usage_total: i64,
    #[serde(default)]
    pub net_usage: i64,
}

impl TransactionInfo {
    pub fn confirmed(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn succeeded(&self) -> bool {
        // Non-contract transactions carry no receipt result at all.
        self.confirmed() && (self.receipt.result.is_empty() || self.receipt.result == "SUCCESS")
    }
}

/// `/wallet/getnowblock`, trimmed to the header fields health checks need.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NowBlock {
    #[serde(default)]
    pub block_header: BlockHeader,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub raw_data: BlockHeaderRaw,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockHeaderRaw {
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub timestamp: i64,
}

impl NowBlock {
    pub fn number(&self) -> i64 {
        self.block_header.raw_data.number
    }
}
