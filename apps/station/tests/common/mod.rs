#![allow(dead_code)]

use station::GasStation;
use station::config::{
    ActivationMode, AppConfig, NetworkKind, NetworkProfile, NodeBackendKind, NodeConfig,
    PlanConfig, WalletConfig,
};
use station::metrics::StationTelemetry;
use station::rpc::{MockAccount, MockNode, NodeClient};
use station::signer::ControlOp;
use std::time::Duration;
use tron::{SUN_PER_TRX, TronAddress};

pub const POOL: &str = "TA4Wt1DUCqz6YegbnsmqsWC5uUfbdBqPxm";
pub const USDT: &str = "TA9pkx4DFxrEw8JZzUtyDrh2uAat1LDuJL";
pub const TARGET: &str = "TRjSYTUmXJByV1vDeWTrqXCRECnqDquatH";

pub fn pool() -> TronAddress {
    TronAddress::from_base58check(POOL).unwrap()
}

pub fn target() -> TronAddress {
    TronAddress::from_base58check(TARGET).unwrap()
}

pub fn testnet_config(allowed_ops: Vec<ControlOp>, fallback_to_owner: bool) -> AppConfig {
    AppConfig {
        network: NetworkProfile {
            kind: NetworkKind::Testnet,
            activation_cost_sun: SUN_PER_TRX,
            usdt_contract: TronAddress::from_base58check(USDT).unwrap(),
            energy_per_trx_fallback: 2.38,
            bandwidth_per_trx_fallback: 1_000.0,
            bandwidth_yield_floor: 200.0,
        },
        node: NodeConfig {
            backend: NodeBackendKind::Mock,
            full_url: String::new(),
            solidity_url: String::new(),
            remote_solidity_urls: Vec::new(),
            timeout: Duration::from_secs(10),
            retries: 3,
        },
        wallet: WalletConfig {
            pool_address: pool(),
            control_key: Some([0x11; 32]),
            owner_key: fallback_to_owner.then_some([0x22; 32]),
            permission_id: 2,
            fallback_to_owner,
            allowed_ops,
            activation_mode: ActivationMode::Transfer,
        },
        plan: PlanConfig {
            energy_safety: 1.15,
            energy_margin_units: 5_000,
            bandwidth_safety: 1.25,
            min_bandwidth_units: 350,
            energy_units_floor: 0,
            bandwidth_units_floor: 0,
            min_delegate_sun: SUN_PER_TRX,
            fallback_energy_existing_holder: 32_000,
            fallback_energy_new_holder: 65_000,
            fallback_bandwidth_units: 345,
            usdt_energy_per_transfer_estimate: 14_650,
            prepare_timeout: Duration::from_secs(60),
        },
    }
}

pub fn default_ops() -> Vec<ControlOp> {
    vec![
        ControlOp::Transfer,
        ControlOp::FreezeBalanceV2,
        ControlOp::DelegateResource,
        ControlOp::UnDelegateResource,
    ]
}

/// A station wired to a shared mock node, with the pool wallet funded.
pub fn station_with_mock(cfg: AppConfig, pool_balance_trx: u64) -> (GasStation, MockNode) {
    let mock = MockNode::new();
    mock.set_account(
        pool(),
        MockAccount {
            activated: true,
            balance_sun: pool_balance_trx * SUN_PER_TRX,
            energy_available: 0,
            bandwidth_available: 0,
        },
    );
    let station = GasStation::with_client(
        cfg,
        NodeClient::mock(mock.clone()),
        StationTelemetry::new(),
    )
    .unwrap();
    (station, mock)
}

/// E1-flavored testnet chain state: getEnergyFee yields ≈76.28 energy/TRX,
/// net totals yield 200 bandwidth/TRX.
pub fn set_testnet_yields(mock: &MockNode) {
    mock.set_chain_parameters(&[("getEnergyFee", 13_109), ("getTransactionFee", 1_000)]);
    mock.set_net_totals(43_200_000_000, 216_000_000);
}
