//! Result records exchanged with callers. Everything here is
//! `serde::Serialize` with stable snake_case field names; the API façade
//! forwards these verbatim.

use serde::Serialize;
use tron::TronAddress;
use tron::api::ResourceCode;

/// An account is ready to send one USDT transfer at these levels.
pub const USDT_READY_MIN_ENERGY: u64 = 15_000;
pub const USDT_READY_MIN_BANDWIDTH: u64 = 300;

/// Simulated energy below this means the recipient already holds USDT
/// (a transfer into a zero balance rewrites storage and costs far more).
pub const EXISTING_HOLDER_ENERGY_CEILING: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    AlreadyReady,
    CompletePreparation,
    PartialPreparation,
    ActivationFailed,
    Failed,
    Cancelled,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Network,
    Simulation,
    InsufficientFunds,
    Permission,
    Broadcast,
    VerificationTimeout,
    Cancelled,
    Timeout,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    #[serde(rename = "where")]
    pub at: &'static str,
    pub retryable: bool,
    pub detail: String,
}

impl ErrorEntry {
    pub fn new(kind: ErrorKind, at: &'static str, detail: impl Into<String>) -> Self {
        let retryable = matches!(
            kind,
            ErrorKind::Network | ErrorKind::Simulation | ErrorKind::VerificationTimeout
        );
        Self {
            kind,
            at,
            retryable,
            detail: detail.into(),
        }
    }
}

/// Momentary view of a target account. Derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    pub activated: bool,
    pub balance_sun: u64,
    pub energy_available: u64,
    pub bandwidth_available: u64,
}

impl ResourceSnapshot {
    /// Element-wise maximum across node views. Masks index lag: any endpoint
    /// that has caught up wins per field.
    pub fn merge_max(views: impl IntoIterator<Item = ResourceSnapshot>) -> ResourceSnapshot {
        views
            .into_iter()
            .fold(ResourceSnapshot::default(), |acc, v| ResourceSnapshot {
                activated: acc.activated || v.activated,
                balance_sun: acc.balance_sun.max(v.balance_sun),
                energy_available: acc.energy_available.max(v.energy_available),
                bandwidth_available: acc.bandwidth_available.max(v.bandwidth_available),
            })
    }

    pub fn usdt_ready(&self) -> bool {
        self.activated
            && self.energy_available >= USDT_READY_MIN_ENERGY
            && self.bandwidth_available >= USDT_READY_MIN_BANDWIDTH
    }

    pub fn available(&self, resource: ResourceCode) -> u64 {
        match resource {
            ResourceCode::Energy => self.energy_available,
            ResourceCode::Bandwidth => self.bandwidth_available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    pub energy_used: u64,
    pub bandwidth_used: u64,
    pub would_succeed: bool,
    /// `Some(true)` iff simulated energy stayed under the existing-holder
    /// ceiling; `None` when simulation failed and estimates were used.
    #[serde(rename = "recipient_is_existing_usdt_holder")]
    pub existing_holder: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelegationPlan {
    pub need_energy_units: u64,
    pub need_bandwidth_units: u64,
    pub energy_trx_to_freeze_sun: u64,
    pub bandwidth_trx_to_freeze_sun: u64,
}

impl DelegationPlan {
    pub fn units_for(&self, resource: ResourceCode) -> u64 {
        match resource {
            ResourceCode::Energy => self.need_energy_units,
            ResourceCode::Bandwidth => self.need_bandwidth_units,
        }
    }

    pub fn freeze_sun_for(&self, resource: ResourceCode) -> u64 {
        match resource {
            ResourceCode::Energy => self.energy_trx_to_freeze_sun,
            ResourceCode::Bandwidth => self.bandwidth_trx_to_freeze_sun,
        }
    }

    pub fn total_freeze_sun(&self) -> u64 {
        self.energy_trx_to_freeze_sun
            .saturating_add(self.bandwidth_trx_to_freeze_sun)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DelegationOutcome {
    pub resource: String,
    pub units_requested: u64,
    pub trx_frozen_sun: u64,
    pub txid: Option<String>,
    pub broadcast_ok: bool,
    pub observed_increase: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VerificationReport {
    pub energy_ok: bool,
    pub bandwidth_ok: bool,
    pub activated: bool,
    pub usdt_ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreparationResult {
    pub success: bool,
    pub strategy: Strategy,
    pub target: TronAddress,
    pub execution_time_ms: u64,
    pub required_energy: u64,
    pub required_bandwidth: u64,
    pub delegations: Vec<DelegationOutcome>,
    pub verification: VerificationReport,
    pub warnings: Vec<String>,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DryRunReport {
    pub target: TronAddress,
    pub needs_activation: bool,
    pub simulation: SimulationResult,
    pub plan: DelegationPlan,
    /// Activation cost (if any) plus both freezes, in TRX.
    pub estimated_cost_trx: f64,
    /// Worst-case fee limit (sun) for the transfer itself, from live chain
    /// fees; absent when the parameters were unreadable.
    pub fee_limit_sun: Option<u64>,
    pub feasible: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointHealth {
    pub node_type: String,
    pub url: String,
    pub connected: bool,
    pub latest_block: i64,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub connected: bool,
    pub latest_block: i64,
    pub endpoints: Vec<EndpointHealth>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub pool_wallet_address: TronAddress,
    pub balance_trx: f64,
    pub usdt_balance: u64,
    pub energy_available: u64,
    pub bandwidth_available: u64,
    /// How many typical USDT transfers the pool's own energy quota could
    /// cover right now, per the configured per-transfer estimate.
    pub usdt_transfers_fundable: u64,
    pub permission_id: u8,
    pub control_ops_allowed: Vec<String>,
    pub fallback_to_owner: bool,
}
