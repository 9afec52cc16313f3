mod common;

use common::*;
use station::rpc::MockAccount;
use tron::SUN_PER_TRX;

#[tokio::test(start_paused = true)]
async fn dry_run_returns_plan_and_cost_without_broadcasting() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);
    set_testnet_yields(&mock);
    mock.set_simulated_energy(1_514);
    mock.set_simulated_raw_len(206);

    let report = station.dry_run(target()).await;

    assert!(report.needs_activation);
    assert!(report.feasible);
    assert_eq!(report.plan.need_energy_units, 7_090);
    assert_eq!(report.plan.need_bandwidth_units, 350);
    // 1 TRX activation + 93 TRX energy freeze + 2 TRX bandwidth freeze.
    assert!((report.estimated_cost_trx - 96.0).abs() < f64::EPSILON);
    // Chain fees were readable, so the worst-case fee limit is quoted too.
    assert!(report.fee_limit_sun.is_some());

    assert_eq!(mock.broadcast_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dry_run_flags_infeasible_pool_balance() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 10);
    set_testnet_yields(&mock);
    mock.set_simulated_energy(1_514);

    let report = station.dry_run(target()).await;
    assert!(!report.feasible);
    assert_eq!(mock.broadcast_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dry_run_uses_floored_bandwidth_yield_for_anomalous_totals() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);
    mock.set_chain_parameters(&[("getEnergyFee", 13_109), ("getTransactionFee", 1_000)]);
    // Raw yield 10 units/TRX: anomalous, floored to 200.
    mock.set_net_totals(1_000, 100);
    mock.set_simulated_energy(1_514);
    mock.set_simulated_raw_len(206);

    let report = station.dry_run(target()).await;

    // ceil(350 / 200) = 2 TRX, not ceil(350 / 10) = 35 TRX.
    assert_eq!(report.plan.bandwidth_trx_to_freeze_sun, 2 * SUN_PER_TRX);
}

#[tokio::test(start_paused = true)]
async fn dry_run_on_ready_target_costs_nothing() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);
    set_testnet_yields(&mock);
    mock.set_account(
        target(),
        MockAccount {
            activated: true,
            balance_sun: 0,
            energy_available: 40_000,
            bandwidth_available: 500,
        },
    );

    let report = station.dry_run(target()).await;
    assert!(!report.needs_activation);
    assert_eq!(report.estimated_cost_trx, 0.0);
    assert!(report.warnings.iter().any(|w| w == "target_already_ready"));
}

#[tokio::test(start_paused = true)]
async fn status_reports_pool_wallet_and_signer_setup() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);
    set_testnet_yields(&mock);

    let status = station.status().await.unwrap();
    assert_eq!(status.pool_wallet_address.to_base58check(), POOL);
    assert!((status.balance_trx - 8_000.0).abs() < f64::EPSILON);
    assert_eq!(status.permission_id, 2);
    assert!(!status.fallback_to_owner);
    // The pool holds no delegated energy of its own in this fixture.
    assert_eq!(status.usdt_transfers_fundable, 0);
    assert!(status
        .control_ops_allowed
        .iter()
        .any(|op| op == "delegate_resource"));

    assert_eq!(mock.broadcast_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn health_reports_connected_endpoints_and_latest_block() {
    let (station, _mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);

    let health = station.health().await;
    assert!(health.connected);
    assert!(health.latest_block > 0);
    assert_eq!(health.endpoints.len(), 1);
    assert!(health.warnings.is_empty());
}
