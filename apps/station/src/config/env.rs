use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct Env {
    pub tron_network: String,

    pub tron_local_node_enabled: bool,

    pub tron_full_node_url: String,

    pub tron_solidity_node_url: String,

    /// Comma-separated remote solidity fallbacks consulted in snapshot reads.
    pub tron_remote_solidity_urls: String,

    /// "http" (default) or "mock" for offline runs.
    pub node_backend: String,

    pub rpc_timeout_secs: u64,

    pub rpc_retries: u32,

    pub gas_wallet_address: String,

    /// Owner key. Discouraged; leave empty for strict control-key operation.
    pub gas_wallet_private_key: String,

    pub gas_wallet_control_private_key: String,

    pub gas_wallet_control_permission_id: u8,

    pub gas_control_fallback_to_owner: bool,

    /// Comma-separated op names the control permission covers.
    pub gas_control_allowed_ops: String,

    pub gas_account_activation_mode: String,

    /// TRX transferred to activate a fresh account; 0 = per-network default.
    pub gas_activation_cost_trx: f64,

    pub usdt_contract_address: String,

    /// Floors on planned delegation units; 0 (the default) disables them
    /// so freezes track simulation. Historical deployments pinned these to
    /// 90_000 / 1_000, which freezes far past a single transfer's needs;
    /// set them explicitly to get that behavior.
    pub target_energy_units: u64,

    pub target_bandwidth_units: u64,

    pub usdt_energy_per_transfer_estimate: u64,

    pub usdt_bandwidth_per_transfer_estimate: u64,

    /// Oracle fallbacks when chain parameters are unavailable; 0 = per-network default.
    pub energy_units_per_trx_estimate: f64,

    pub bandwidth_units_per_trx_estimate: f64,

    pub delegation_safety_multiplier: f64,

    pub min_delegate_trx: u64,

    pub prepare_timeout_secs: u64,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            tron_network: "testnet".to_string(),
            tron_local_node_enabled: false,
            tron_full_node_url: String::new(),
            tron_solidity_node_url: String::new(),
            tron_remote_solidity_urls: String::new(),
            node_backend: "http".to_string(),
            rpc_timeout_secs: 10,
            rpc_retries: 3,
            gas_wallet_address: String::new(),
            gas_wallet_private_key: String::new(),
            gas_wallet_control_private_key: String::new(),
            gas_wallet_control_permission_id: 2,
            gas_control_fallback_to_owner: true,
            gas_control_allowed_ops:
                "transfer,freeze_balance_v2,delegate_resource,undelegate_resource".to_string(),
            gas_account_activation_mode: "transfer".to_string(),
            gas_activation_cost_trx: 0.0,
            usdt_contract_address: String::new(),
            target_energy_units: 0,
            target_bandwidth_units: 0,
            usdt_energy_per_transfer_estimate: 14_650,
            usdt_bandwidth_per_transfer_estimate: 345,
            energy_units_per_trx_estimate: 0.0,
            bandwidth_units_per_trx_estimate: 0.0,
            delegation_safety_multiplier: 1.15,
            min_delegate_trx: 1,
            prepare_timeout_secs: 60,
        }
    }
}
