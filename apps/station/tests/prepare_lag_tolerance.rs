mod common;

use common::*;
use station::rpc::MockAccount;
use station::types::{ResourceSnapshot, Strategy};
use tron::api::ResourceCode;

#[tokio::test(start_paused = true)]
async fn stuck_zero_indexes_still_succeed_with_timeout_warnings() {
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
    // No delegation effects configured: every verification poll reads zero,
    // as if all indexes were lagging past the whole window.

    let result = station.prepare_for_usdt(target()).await;

    // Broadcasts went through and each freeze covers its units, so the
    // preparation is a success with the timeouts downgraded to warnings.
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.strategy, Strategy::CompletePreparation);
    assert!(result.delegations.iter().all(|d| d.broadcast_ok));
    assert!(result.delegations.iter().all(|d| !d.observed_increase));
    assert!(result
        .warnings
        .iter()
        .any(|w| w == "verification_timeout:energy"));
    assert!(result
        .warnings
        .iter()
        .any(|w| w == "verification_timeout:bandwidth"));
    assert!(result.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn delegation_observed_after_three_lagging_polls() {
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
    mock.set_delegation_effect(ResourceCode::Energy, 8_000);
    mock.set_delegation_effect(ResourceCode::Bandwidth, 400);

    // The energy verification's first three polls see a stale zero view
    // before the index catches up. One extra round covers the baseline read.
    let lagging = ResourceSnapshot {
        activated: true,
        ..Default::default()
    };
    for _ in 0..4 {
        mock.push_snapshot_views(target(), vec![lagging]);
    }

    let result = station.prepare_for_usdt(target()).await;

    assert!(result.success, "errors: {:?}", result.errors);
    let energy = &result.delegations[0];
    assert!(energy.observed_increase);
    assert!(!result
        .warnings
        .iter()
        .any(|w| w == "verification_timeout:energy"));
}

#[tokio::test(start_paused = true)]
async fn snapshot_reads_take_the_maximum_across_endpoint_views() {
    let (station, mock) = station_with_mock(testnet_config(default_ops(), false), 8_000);
    set_testnet_yields(&mock);

    // Three endpoints disagree while an index catches up; the probe must
    // see the most advanced view and short-circuit as already ready.
    mock.push_snapshot_views(
        target(),
        vec![
            ResourceSnapshot {
                activated: true,
                balance_sun: 0,
                energy_available: 0,
                bandwidth_available: 900,
            },
            ResourceSnapshot {
                activated: true,
                balance_sun: 0,
                energy_available: 16_000,
                bandwidth_available: 0,
            },
            ResourceSnapshot {
                activated: true,
                balance_sun: 0,
                energy_available: 6_000,
                bandwidth_available: 100,
            },
        ],
    );

    let result = station.prepare_for_usdt(target()).await;
    assert_eq!(result.strategy, Strategy::AlreadyReady);
    assert_eq!(mock.broadcast_count(), 0);
}
