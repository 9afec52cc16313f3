//! Delegation planning and execution: freeze TRX on the pool wallet, then
//! delegate the resulting resource share to the target.

use crate::config::PlanConfig;
use crate::metrics::StationTelemetry;
use crate::oracle::ResourceYields;
use crate::rpc::NodeClient;
use crate::signer::{ControlOp, StationSigner};
use crate::types::{
    DelegationOutcome, DelegationPlan, ErrorEntry, ErrorKind, ResourceSnapshot, SimulationResult,
};
use crate::verify::Verifier;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tron::api::ResourceCode;
use tron::{SUN_PER_TRX, TronAddress};

/// Stake 2.0 lock period in blocks: 3 days of 3-second blocks, the network
/// minimum for delegations.
pub const DELEGATE_LOCK_BLOCKS: u64 = 86_400;

/// Derives per-resource unit targets and TRX freezes from a simulation and
/// the oracle's current yields. Freezes round up to whole TRX and never drop
/// under the network minimum.
pub fn build_plan(sim: &SimulationResult, yields: &ResourceYields, cfg: &PlanConfig) -> DelegationPlan {
    let need_energy_units = ((sim.energy_used as f64 * cfg.energy_safety).ceil() as u64)
        .saturating_add(cfg.energy_margin_units)
        .max(cfg.energy_units_floor);

    let need_bandwidth_units = ((sim.bandwidth_used as f64 * cfg.bandwidth_safety).ceil() as u64)
        .max(cfg.min_bandwidth_units)
        .max(cfg.bandwidth_units_floor);

    DelegationPlan {
        need_energy_units,
        need_bandwidth_units,
        energy_trx_to_freeze_sun: freeze_sun(
            need_energy_units,
            yields.energy_per_trx,
            cfg.min_delegate_sun,
        ),
        bandwidth_trx_to_freeze_sun: freeze_sun(
            need_bandwidth_units,
            yields.bandwidth_per_trx,
            cfg.min_delegate_sun,
        ),
    }
}

fn freeze_sun(units: u64, units_per_trx: f64, min_sun: u64) -> u64 {
    if units_per_trx <= 0.0 {
        return min_sun.max(SUN_PER_TRX);
    }
    let exact = (units as f64 / units_per_trx * SUN_PER_TRX as f64).ceil() as u64;
    tron::ceil_sun_to_whole_trx(exact)
        .max(min_sun)
        .max(SUN_PER_TRX)
}

#[derive(Debug)]
pub struct DelegationRun {
    pub outcome: DelegationOutcome,
    /// The resource is considered delivered: observed on-chain, or
    /// guaranteed by the freeze math with only the index lagging.
    pub satisfied: bool,
    pub cancelled: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<ErrorEntry>,
}

pub struct Delegator {
    client: NodeClient,
    signer: Arc<StationSigner>,
    pool: TronAddress,
    telemetry: StationTelemetry,
}

impl Delegator {
    pub fn new(
        client: NodeClient,
        signer: Arc<StationSigner>,
        pool: TronAddress,
        telemetry: StationTelemetry,
    ) -> Self {
        Self {
            client,
            signer,
            pool,
            telemetry,
        }
    }

    /// Freezes and delegates one resource. The pool-wallet lock is held only
    /// across build+sign+broadcast; verification runs outside it.
    #[allow(clippy::too_many_arguments)]
    pub async fn delegate(
        &self,
        target: TronAddress,
        resource: ResourceCode,
        units: u64,
        freeze_sun_amount: u64,
        units_per_trx: f64,
        broadcast_lock: &tokio::sync::Mutex<()>,
        verifier: &Verifier,
        cancel: &CancellationToken,
    ) -> DelegationRun {
        let resource_label: &'static str = match resource {
            ResourceCode::Energy => "energy",
            ResourceCode::Bandwidth => "bandwidth",
        };
        let mut run = DelegationRun {
            outcome: DelegationOutcome {
                resource: resource_label.to_string(),
                units_requested: units,
                trx_frozen_sun: 0,
                txid: None,
                broadcast_ok: false,
                observed_increase: false,
            },
            satisfied: false,
            cancelled: false,
            warnings: Vec::new(),
            errors: Vec::new(),
        };

        let freeze_grant = match self.signer.authorize(ControlOp::FreezeBalanceV2) {
            Ok(g) => g,
            Err(err) => {
                run.errors
                    .push(ErrorEntry::new(ErrorKind::Permission, "delegate", err.to_string()));
                self.telemetry.delegation(resource_label, false);
                return run;
            }
        };
        let delegate_grant = match self.signer.authorize(ControlOp::DelegateResource) {
            Ok(g) => g,
            Err(err) => {
                run.errors
                    .push(ErrorEntry::new(ErrorKind::Permission, "delegate", err.to_string()));
                self.telemetry.delegation(resource_label, false);
                return run;
            }
        };

        let baseline = match self.client.snapshot(target).await {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(err = %err, "baseline snapshot failed; assuming zero");
                run.warnings.push(format!("delegate:{resource_label}:baseline_unavailable"));
                ResourceSnapshot::default()
            }
        };

        // Build + sign + broadcast under the pool-wallet sequence lock so
        // concurrent preparations cannot collide on reference blocks.
        let broadcast_res = {
            let _guard = broadcast_lock.lock().await;

            let freeze = async {
                let mut tx = self
                    .client
                    .build_freeze_balance_v2(
                        self.pool,
                        freeze_sun_amount,
                        resource,
                        freeze_grant.permission_id,
                    )
                    .await?;
                self.signer.sign(&freeze_grant, &mut tx)?;
                anyhow::Ok(self.client.broadcast(&tx).await?)
            }
            .await;

            match freeze {
                Ok(res) if !res.result => {
                    run.errors.push(ErrorEntry::new(
                        ErrorKind::Broadcast,
                        "delegate",
                        format!(
                            "freeze {resource_label} rejected: {} {}",
                            res.code,
                            res.decoded_message()
                        ),
                    ));
                    self.telemetry.delegation(resource_label, false);
                    return run;
                }
                Ok(_) => {}
                Err(err) => {
                    run.errors.push(ErrorEntry::new(
                        ErrorKind::Network,
                        "delegate",
                        format!("freeze {resource_label}: {err:#}"),
                    ));
                    self.telemetry.delegation(resource_label, false);
                    return run;
                }
            }
            run.outcome.trx_frozen_sun = freeze_sun_amount;

            async {
                let mut tx = self
                    .client
                    .build_delegate_resource(
                        self.pool,
                        target,
                        freeze_sun_amount,
                        resource,
                        DELEGATE_LOCK_BLOCKS,
                        delegate_grant.permission_id,
                    )
                    .await?;
                let txid = self.signer.sign(&delegate_grant, &mut tx)?;
                let res = self.client.broadcast(&tx).await?;
                anyhow::Ok((txid, res))
            }
            .await
        };

        match broadcast_res {
            Ok((txid, res)) if res.result => {
                run.outcome.txid = Some(txid);
                run.outcome.broadcast_ok = true;
            }
            Ok((txid, res)) => {
                run.outcome.txid = Some(txid);
                run.errors.push(ErrorEntry::new(
                    ErrorKind::Broadcast,
                    "delegate",
                    format!(
                        "delegate {resource_label} rejected: {} {}",
                        res.code,
                        res.decoded_message()
                    ),
                ));
                self.telemetry.delegation(resource_label, false);
                return run;
            }
            Err(err) => {
                run.errors.push(ErrorEntry::new(
                    ErrorKind::Network,
                    "delegate",
                    format!("delegate {resource_label}: {err:#}"),
                ));
                self.telemetry.delegation(resource_label, false);
                return run;
            }
        }

        let verify = verifier.await_increase(target, resource, baseline, cancel).await;
        if verify.cancelled {
            run.cancelled = true;
            self.telemetry.delegation(resource_label, false);
            return run;
        }
        run.outcome.observed_increase = verify.observed_increase;

        if verify.observed_increase {
            run.satisfied = true;
        } else {
            // The freeze rounds up to at least whole-TRX coverage of the
            // requested units, so a clean broadcast with a silent index is
            // still a delivery.
            let guaranteed =
                (freeze_sun_amount as f64 / SUN_PER_TRX as f64) * units_per_trx >= units as f64;
            if guaranteed {
                run.satisfied = true;
                run.warnings.push(format!("verification_timeout:{resource_label}"));
                self.telemetry.verification_timeout(resource_label);
            } else {
                run.errors.push(ErrorEntry::new(
                    ErrorKind::VerificationTimeout,
                    "delegate",
                    format!("no {resource_label} increase observed within the window"),
                ));
            }
        }

        self.telemetry.delegation(resource_label, run.satisfied);
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yields(energy: f64, bandwidth: f64) -> ResourceYields {
        ResourceYields {
            energy_per_trx: energy,
            bandwidth_per_trx: bandwidth,
            fees: None,
            warnings: Vec::new(),
        }
    }

    fn plan_cfg() -> PlanConfig {
        PlanConfig {
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
            prepare_timeout: std::time::Duration::from_secs(60),
        }
    }

    fn sim(energy: u64, bandwidth: u64) -> SimulationResult {
        SimulationResult {
            energy_used: energy,
            bandwidth_used: bandwidth,
            would_succeed: true,
            existing_holder: Some(true),
        }
    }

    #[test]
    fn plan_matches_testnet_worked_example() {
        // energy 1817, yields 76.28 energy/TRX and 200 bandwidth/TRX.
        let plan = build_plan(&sim(1_817, 270), &yields(76.28, 200.0), &plan_cfg());

        // ceil(1817 * 1.15) + 5000 = 7090 units.
        assert_eq!(plan.need_energy_units, 7_090);
        // ceil(7090 / 76.28) = 93 whole TRX.
        assert_eq!(plan.energy_trx_to_freeze_sun, 93 * SUN_PER_TRX);

        // ceil(270 * 1.25) = 338, floored to 350 units.
        assert_eq!(plan.need_bandwidth_units, 350);
        // ceil(350 / 200) = 2 TRX.
        assert_eq!(plan.bandwidth_trx_to_freeze_sun, 2 * SUN_PER_TRX);
    }

    #[test]
    fn freezes_never_drop_under_one_trx() {
        let plan = build_plan(&sim(1, 1), &yields(1_000_000.0, 1_000_000.0), &plan_cfg());
        assert_eq!(plan.energy_trx_to_freeze_sun, SUN_PER_TRX);
        assert_eq!(plan.bandwidth_trx_to_freeze_sun, SUN_PER_TRX);
    }

    #[test]
    fn freeze_covers_units_round_trip() {
        // Whatever the simulation says, the frozen TRX converted back
        // through the same yield covers the planned units.
        for energy in [0u64, 1, 1_817, 31_999, 50_000, 120_000] {
            let y = yields(76.28, 200.0);
            let plan = build_plan(&sim(energy, 300), &y, &plan_cfg());
            let covered = (plan.energy_trx_to_freeze_sun as f64 / SUN_PER_TRX as f64)
                * y.energy_per_trx;
            assert!(
                covered >= plan.need_energy_units as f64,
                "energy={energy} covered={covered} needed={}",
                plan.need_energy_units
            );
        }
    }

    #[test]
    fn configured_floor_raises_energy_units() {
        let mut cfg = plan_cfg();
        cfg.energy_units_floor = 90_000;
        let plan = build_plan(&sim(1_817, 270), &yields(76.28, 200.0), &cfg);
        assert_eq!(plan.need_energy_units, 90_000);
    }

    #[test]
    fn zero_yield_falls_back_to_minimum_freeze() {
        let plan = build_plan(&sim(1_817, 270), &yields(0.0, 0.0), &plan_cfg());
        assert_eq!(plan.energy_trx_to_freeze_sun, SUN_PER_TRX);
    }
}
