mod common;

use common::*;
use station::rpc::MockAccount;
use station::signer::ControlOp;
use station::types::{ErrorKind, Strategy};
use tokio_util::sync::CancellationToken;
use tron::api::ResourceCode;

#[tokio::test(start_paused = true)]
async fn activation_without_transfer_permission_fails_fast() {
    // Control key may freeze and delegate, but not move TRX; no owner
    // fallback configured.
    let cfg = testnet_config(
        vec![ControlOp::FreezeBalanceV2, ControlOp::DelegateResource],
        false,
    );
    let (station, mock) = station_with_mock(cfg, 8_000);
    set_testnet_yields(&mock);

    let result = station.prepare_for_usdt(target()).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::ActivationFailed);
    let permission_errors: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::Permission)
        .collect();
    assert_eq!(permission_errors.len(), 1);
    assert_eq!(permission_errors[0].at, "activate");
    assert!(!permission_errors[0].retryable);
    assert_eq!(mock.broadcast_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn owner_fallback_rescues_missing_transfer_permission() {
    let cfg = testnet_config(
        vec![ControlOp::FreezeBalanceV2, ControlOp::DelegateResource],
        true,
    );
    let (station, mock) = station_with_mock(cfg, 8_000);
    set_testnet_yields(&mock);
    mock.set_delegation_effect(ResourceCode::Energy, 100_000);
    mock.set_delegation_effect(ResourceCode::Bandwidth, 1_000);

    let result = station.prepare_for_usdt(target()).await;

    assert!(result.success, "errors: {:?}", result.errors);
    let recs = mock.broadcasts();
    // The activation transfer was signed by the owner key: no permission id.
    assert_eq!(recs[0].kind, "transfer");
    assert_eq!(recs[0].permission_id, None);
    // Freeze/delegate stayed on the control permission.
    assert!(recs[1..].iter().all(|r| r.permission_id == Some(2)));
}

#[tokio::test(start_paused = true)]
async fn rejected_bandwidth_delegation_is_partial_and_keeps_energy_frozen() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);
    set_testnet_yields(&mock);
    mock.set_account(
        target(),
        MockAccount {
            activated: true,
            ..Default::default()
        },
    );
    mock.set_simulated_energy(1_817);
    mock.set_delegation_effect(ResourceCode::Energy, 10_000);
    mock.fail_broadcast("delegate:BANDWIDTH", "contract validate error");

    let result = station.prepare_for_usdt(target()).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::PartialPreparation);
    assert_eq!(result.delegations.len(), 2);

    let energy = &result.delegations[0];
    assert_eq!(energy.resource, "energy");
    assert!(energy.broadcast_ok);
    assert!(energy.observed_increase);
    assert!(energy.trx_frozen_sun > 0);

    let bandwidth = &result.delegations[1];
    assert_eq!(bandwidth.resource, "bandwidth");
    assert!(!bandwidth.broadcast_ok);
    // The bandwidth freeze went through before the delegation was rejected;
    // that TRX stays frozen on the pool.
    assert!(bandwidth.trx_frozen_sun > 0);

    assert!(result.errors.iter().any(|e| {
        e.kind == ErrorKind::Broadcast && e.detail.contains("contract validate error")
    }));
}

#[tokio::test(start_paused = true)]
async fn empty_pool_wallet_aborts_before_any_broadcast() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 1);
    set_testnet_yields(&mock);

    let result = station.prepare_for_usdt(target()).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::Failed);
    assert!(result
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::InsufficientFunds && e.at == "plan"));
    assert_eq!(mock.broadcast_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_preparation_reports_cancelled_strategy() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);
    set_testnet_yields(&mock);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = station.prepare_with_cancel(target(), cancel).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::Cancelled);
    assert!(result.errors.iter().any(|e| e.kind == ErrorKind::Cancelled));
    assert_eq!(mock.broadcast_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_prepare_timeout_reports_timeout_with_partials() {
    let mut cfg = testnet_config(default_ops(), false);
    cfg.plan.prepare_timeout = std::time::Duration::ZERO;
    let (station, mock) = station_with_mock(cfg, 8_000);
    set_testnet_yields(&mock);

    let result = station.prepare_for_usdt(target()).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::Timeout);
    assert!(result.errors.iter().any(|e| e.kind == ErrorKind::Timeout));
    assert_eq!(mock.broadcast_count(), 0);
}
