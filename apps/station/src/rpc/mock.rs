//! In-memory node backend. Compiled unconditionally and selected by config,
//! so offline runs and tests drive the exact same client surface as HTTP.
//!
//! Behavior is programmable per test: accounts, chain parameters, scripted
//! per-endpoint snapshot views (to model index lag), simulated energy,
//! broadcast failures. Every broadcast is recorded.

use crate::types::ResourceSnapshot;
use anyhow::{Context, Result};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tron::TronAddress;
use tron::api::{
    Account, AccountResourceMessage, BroadcastResult, ChainParameter, ChainParameters,
    ResourceCode, Transaction, TransactionInfo, TransactionReceipt, TriggerConstantResult,
    TriggerReturn,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MockAccount {
    pub activated: bool,
    pub balance_sun: u64,
    pub energy_available: u64,
    pub bandwidth_available: u64,
}

#[derive(Debug, Clone)]
pub struct BroadcastRecord {
    pub kind: String,
    pub target: String,
    pub amount_sun: u64,
    pub resource: Option<String>,
    pub permission_id: Option<u8>,
    pub txid: String,
}

#[derive(Debug, Clone)]
enum SimBehavior {
    Ok { energy_used: u64 },
    Revert { message: String },
    Unavailable,
}

struct MockState {
    accounts: HashMap<String, MockAccount>,
    chain_parameters: Vec<(String, i64)>,
    total_net_limit: i64,
    total_net_weight: i64,
    simulation: SimBehavior,
    sim_raw_len: usize,
    snapshot_scripts: HashMap<String, VecDeque<Vec<ResourceSnapshot>>>,
    delegation_effects: HashMap<String, u64>,
    broadcast_failures: HashMap<String, String>,
    broadcasts: Vec<BroadcastRecord>,
    confirm_broadcasts: bool,
    confirmed: HashMap<String, bool>,
    latest_block: i64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            chain_parameters: Vec::new(),
            total_net_limit: 0,
            total_net_weight: 0,
            simulation: SimBehavior::Ok { energy_used: 1_817 },
            sim_raw_len: 206,
            snapshot_scripts: HashMap::new(),
            delegation_effects: HashMap::new(),
            broadcast_failures: HashMap::new(),
            broadcasts: Vec::new(),
            confirm_broadcasts: true,
            confirmed: HashMap::new(),
            latest_block: 1_000,
        }
    }
}

#[derive(Clone)]
pub struct MockNode {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNode {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ---- programming surface -------------------------------------------

    pub fn set_account(&self, addr: TronAddress, account: MockAccount) {
        self.lock().accounts.insert(addr.to_base58check(), account);
    }

    pub fn set_chain_parameters(&self, params: &[(&str, i64)]) {
        self.lock().chain_parameters = params
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
    }

    pub fn set_net_totals(&self, total_limit: i64, total_weight: i64) {
        let mut s = self.lock();
        s.total_net_limit = total_limit;
        s.total_net_weight = total_weight;
    }

    pub fn set_simulated_energy(&self, energy_used: u64) {
        self.lock().simulation = SimBehavior::Ok { energy_used };
    }

    pub fn set_simulation_revert(&self, message: &str) {
        self.lock().simulation = SimBehavior::Revert {
            message: message.to_string(),
        };
    }

    pub fn set_simulation_unavailable(&self) {
        self.lock().simulation = SimBehavior::Unavailable;
    }

    pub fn set_simulated_raw_len(&self, len: usize) {
        self.lock().sim_raw_len = len;
    }

    /// Queues one poll round of per-endpoint views for `addr`. While the
    /// queue is non-empty each snapshot read pops one round; afterwards
    /// reads fall back to the live account state.
    pub fn push_snapshot_views(&self, addr: TronAddress, views: Vec<ResourceSnapshot>) {
        self.lock()
            .snapshot_scripts
            .entry(addr.to_base58check())
            .or_default()
            .push_back(views);
    }

    /// Units credited to the receiver when a delegation of `resource`
    /// is broadcast. Unset resources observe no change (index lag).
    pub fn set_delegation_effect(&self, resource: ResourceCode, units: u64) {
        self.lock()
            .delegation_effects
            .insert(resource.as_str().to_string(), units);
    }

    /// Makes broadcasts of `kind` fail with a node rejection. Kinds:
    /// `transfer`, `create_account`, `freeze:ENERGY`, `delegate:BANDWIDTH`, ...
    pub fn fail_broadcast(&self, kind: &str, message: &str) {
        self.lock()
            .broadcast_failures
            .insert(kind.to_string(), message.to_string());
    }

    pub fn set_confirmations_enabled(&self, enabled: bool) {
        self.lock().confirm_broadcasts = enabled;
    }

    pub fn broadcasts(&self) -> Vec<BroadcastRecord> {
        self.lock().broadcasts.clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.lock().broadcasts.len()
    }

    // ---- client surface ------------------------------------------------

    pub fn get_account(&self, addr: TronAddress) -> Option<Account> {
        let key = addr.to_base58check();
        let s = self.lock();
        let acc = s.accounts.get(&key)?;
        if !acc.activated {
            return None;
        }
        Some(Account {
            address: key,
            balance: acc.balance_sun as i64,
            create_time: 1,
        })
    }

    pub fn get_account_resource(&self, addr: TronAddress) -> AccountResourceMessage {
        let key = addr.to_base58check();
        let s = self.lock();
        let acc = s.accounts.get(&key).copied().unwrap_or_default();
        AccountResourceMessage {
            energy_limit: acc.energy_available as i64,
            net_limit: acc.bandwidth_available as i64,
            total_net_limit: s.total_net_limit,
            total_net_weight: s.total_net_weight,
            ..Default::default()
        }
    }

    pub fn get_chain_parameters(&self) -> ChainParameters {
        ChainParameters {
            chain_parameter: self
                .lock()
                .chain_parameters
                .iter()
                .map(|(k, v)| ChainParameter {
                    key: k.clone(),
                    value: *v,
                })
                .collect(),
        }
    }

    pub fn trigger_constant_contract(&self) -> Result<TriggerConstantResult> {
        let s = self.lock();
        match &s.simulation {
            SimBehavior::Unavailable => anyhow::bail!("simulation endpoint unavailable"),
            SimBehavior::Revert { message } => Ok(TriggerConstantResult {
                result: TriggerReturn {
                    result: false,
                    message: message.clone(),
                },
                energy_used: 0,
                constant_result: Vec::new(),
                transaction: None,
            }),
            SimBehavior::Ok { energy_used } => Ok(TriggerConstantResult {
                result: TriggerReturn {
                    result: true,
                    message: String::new(),
                },
                energy_used: *energy_used as i64,
                constant_result: vec![format!("{:064x}", 1)],
                transaction: Some(synthetic_tx(&json!({"kind": "constant"}), s.sim_raw_len)),
            }),
        }
    }

    pub fn build_transfer(
        &self,
        from: TronAddress,
        to: TronAddress,
        amount_sun: u64,
        permission_id: Option<u8>,
    ) -> Transaction {
        build_tx(json!({
            "kind": "transfer",
            "owner": from.to_base58check(),
            "target": to.to_base58check(),
            "amount_sun": amount_sun,
            "permission_id": permission_id,
        }))
    }

    pub fn build_freeze_balance_v2(
        &self,
        owner: TronAddress,
        frozen_balance_sun: u64,
        resource: ResourceCode,
        permission_id: Option<u8>,
    ) -> Transaction {
        build_tx(json!({
            "kind": "freeze",
            "owner": owner.to_base58check(),
            "target": owner.to_base58check(),
            "amount_sun": frozen_balance_sun,
            "resource": resource.as_str(),
            "permission_id": permission_id,
        }))
    }

    pub fn build_delegate_resource(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        balance_sun: u64,
        resource: ResourceCode,
        lock_period_blocks: u64,
        permission_id: Option<u8>,
    ) -> Transaction {
        build_tx(json!({
            "kind": "delegate",
            "owner": owner.to_base58check(),
            "target": receiver.to_base58check(),
            "amount_sun": balance_sun,
            "resource": resource.as_str(),
            "lock_period": lock_period_blocks,
            "permission_id": permission_id,
        }))
    }

    pub fn build_create_account(
        &self,
        owner: TronAddress,
        account: TronAddress,
        permission_id: Option<u8>,
    ) -> Transaction {
        build_tx(json!({
            "kind": "create_account",
            "owner": owner.to_base58check(),
            "target": account.to_base58check(),
            "amount_sun": 0,
            "permission_id": permission_id,
        }))
    }

    pub fn broadcast(&self, tx: &Transaction) -> Result<BroadcastResult> {
        let raw = &tx.raw_data;
        let kind = raw
            .get("kind")
            .and_then(|v| v.as_str())
            .context("mock broadcast: unknown transaction shape")?
            .to_string();
        let target = raw
            .get("target")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let amount_sun = raw.get("amount_sun").and_then(|v| v.as_u64()).unwrap_or(0);
        let resource = raw
            .get("resource")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let permission_id = raw
            .get("permission_id")
            .and_then(|v| v.as_u64())
            .map(|v| v as u8);

        let fail_key = match &resource {
            Some(r) => format!("{kind}:{r}"),
            None => kind.clone(),
        };

        let mut s = self.lock();
        s.broadcasts.push(BroadcastRecord {
            kind: kind.clone(),
            target: target.clone(),
            amount_sun,
            resource: resource.clone(),
            permission_id,
            txid: tx.tx_id.clone(),
        });

        if let Some(message) = s.broadcast_failures.get(&fail_key).cloned() {
            return Ok(BroadcastResult {
                result: false,
                txid: tx.tx_id.clone(),
                code: "CONTRACT_VALIDATE_ERROR".to_string(),
                message: hex::encode(message),
            });
        }

        match kind.as_str() {
            "transfer" => {
                let entry = s.accounts.entry(target).or_default();
                entry.activated = true;
                entry.balance_sun = entry.balance_sun.saturating_add(amount_sun);
            }
            "create_account" => {
                s.accounts.entry(target).or_default().activated = true;
            }
            "delegate" => {
                let units = resource
                    .as_deref()
                    .and_then(|r| s.delegation_effects.get(r).copied())
                    .unwrap_or(0);
                let entry = s.accounts.entry(target).or_default();
                match resource.as_deref() {
                    Some("ENERGY") => {
                        entry.energy_available = entry.energy_available.saturating_add(units);
                    }
                    Some("BANDWIDTH") => {
                        entry.bandwidth_available =
                            entry.bandwidth_available.saturating_add(units);
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        let confirm = s.confirm_broadcasts;
        s.confirmed.insert(tx.tx_id.clone(), confirm);

        Ok(BroadcastResult {
            result: true,
            txid: tx.tx_id.clone(),
            code: String::new(),
            message: String::new(),
        })
    }

    pub fn get_transaction_info(&self, txid: &str) -> TransactionInfo {
        let s = self.lock();
        match s.confirmed.get(txid) {
            Some(true) => TransactionInfo {
                id: txid.to_string(),
                block_number: s.latest_block,
                receipt: TransactionReceipt {
                    result: "SUCCESS".to_string(),
                    ..Default::default()
                },
            },
            _ => TransactionInfo::default(),
        }
    }

    pub fn snapshot_views(&self, addr: TronAddress) -> Vec<ResourceSnapshot> {
        let key = addr.to_base58check();
        let mut s = self.lock();
        if let Some(script) = s.snapshot_scripts.get_mut(&key)
            && let Some(round) = script.pop_front()
        {
            return round;
        }
        let acc = s.accounts.get(&key).copied().unwrap_or_default();
        vec![ResourceSnapshot {
            activated: acc.activated,
            balance_sun: acc.balance_sun,
            energy_available: acc.energy_available,
            bandwidth_available: acc.bandwidth_available,
        }]
    }

    pub fn endpoint_health(&self) -> Vec<crate::types::EndpointHealth> {
        vec![crate::types::EndpointHealth {
            node_type: "mock".to_string(),
            url: "mock://local".to_string(),
            connected: true,
            latest_block: self.lock().latest_block,
            latency_ms: 0,
        }]
    }
}

fn build_tx(raw_data: serde_json::Value) -> Transaction {
    let len = raw_data.to_string().len();
    synthetic_tx(&raw_data, len)
}

fn synthetic_tx(raw_data: &serde_json::Value, raw_len: usize) -> Transaction {
    // Pad the serialized form to the requested length so bandwidth math has
    // something realistic to measure.
    let mut bytes = raw_data.to_string().into_bytes();
    bytes.resize(raw_len.max(bytes.len()), b' ');
    let tx_id = hex::encode(Sha256::digest(&bytes));
    Transaction {
        tx_id,
        raw_data: raw_data.clone(),
        raw_data_hex: hex::encode(&bytes),
        signature: Vec::new(),
        visible: Some(true),
    }
}
