use crate::signer::ControlOp;
use std::time::Duration;
use tron::TronAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Mainnet,
    Testnet,
}

impl NetworkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "mainnet",
            NetworkKind::Testnet => "testnet",
        }
    }
}

/// Immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub kind: NetworkKind,
    /// TRX sent to create a fresh account in `transfer` activation mode.
    pub activation_cost_sun: u64,
    pub usdt_contract: TronAddress,
    /// Energy units per staked TRX when `getEnergyFee` is unavailable.
    pub energy_per_trx_fallback: f64,
    /// Bandwidth units per staked TRX when neither net totals nor
    /// `getTransactionFee` are usable.
    pub bandwidth_per_trx_fallback: f64,
    /// Raw bandwidth yields under 50 are index noise on small testnets;
    /// anything below gets replaced with this floor.
    pub bandwidth_yield_floor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBackendKind {
    Http,
    Mock,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub backend: NodeBackendKind,
    pub full_url: String,
    pub solidity_url: String,
    pub remote_solidity_urls: Vec<String>,
    pub timeout: Duration,
    pub retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    Transfer,
    CreateAccount,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub pool_address: TronAddress,
    /// Control key listed in the pool wallet's active permission.
    pub control_key: Option<[u8; 32]>,
    /// Owner key; discouraged, used only as an explicit fallback.
    pub owner_key: Option<[u8; 32]>,
    pub permission_id: u8,
    pub fallback_to_owner: bool,
    pub allowed_ops: Vec<ControlOp>,
    pub activation_mode: ActivationMode,
}

#[derive(Debug, Clone)]
pub struct PlanConfig {
    /// Multiplier on simulated energy before the flat margin.
    pub energy_safety: f64,
    pub energy_margin_units: u64,
    pub bandwidth_safety: f64,
    /// Never plan below one fully-signed TRC20 transfer's bandwidth.
    pub min_bandwidth_units: u64,
    /// Optional floors on planned units; 0 disables.
    pub energy_units_floor: u64,
    pub bandwidth_units_floor: u64,
    /// Network minimum per freeze.
    pub min_delegate_sun: u64,
    /// Estimates used when simulation is unavailable.
    pub fallback_energy_existing_holder: u64,
    pub fallback_energy_new_holder: u64,
    pub fallback_bandwidth_units: u64,
    /// Long-run per-transfer figures surfaced by dry runs.
    pub usdt_energy_per_transfer_estimate: u64,
    pub prepare_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub network: NetworkProfile,
    pub node: NodeConfig,
    pub wallet: WalletConfig,
    pub plan: PlanConfig,
}
