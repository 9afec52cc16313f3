//! The gas station service. One injected value owns the node client, the
//! permission-scoped signer and the pool-wallet broadcast lock; every public
//! operation hangs off it.

use crate::activate::Activator;
use crate::config::{ActivationMode, AppConfig};
use crate::delegate::{Delegator, build_plan};
use crate::metrics::StationTelemetry;
use crate::oracle::{ResourceOracle, ResourceYields};
use crate::rpc::NodeClient;
use crate::signer::StationSigner;
use crate::simulate::Simulator;
use crate::types::{
    DryRunReport, ErrorEntry, ErrorKind, HealthReport, PreparationResult, ResourceSnapshot,
    SimulationResult, StatusReport, Strategy, VerificationReport,
};
use crate::verify::Verifier;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tron::api::ResourceCode;
use tron::resources::quote_fee_limit_sun;
use tron::{SUN_PER_TRX, TronAddress};

/// Margin tolerated between requested and observed resources: the index may
/// round delegated shares down slightly.
const VERIFY_HEADROOM: f64 = 0.9;

pub struct GasStation {
    cfg: AppConfig,
    client: NodeClient,
    signer: Arc<StationSigner>,
    telemetry: StationTelemetry,
    /// Serializes build+sign+broadcast for everything spending the pool
    /// wallet under one permission id; reference-block collisions otherwise
    /// invalidate concurrent transactions.
    broadcast_lock: Arc<tokio::sync::Mutex<()>>,
}

impl GasStation {
    pub fn new(cfg: AppConfig, telemetry: StationTelemetry) -> Result<Self> {
        let client = NodeClient::from_config(&cfg.node, telemetry.clone())?;
        Self::with_client(cfg, client, telemetry)
    }

    /// Construction with an injected client; tests pass the mock backend.
    pub fn with_client(
        cfg: AppConfig,
        client: NodeClient,
        telemetry: StationTelemetry,
    ) -> Result<Self> {
        let signer = Arc::new(StationSigner::from_config(&cfg.wallet).context("init signer")?);
        if cfg.wallet.activation_mode == ActivationMode::CreateAccount {
            tracing::warn!(
                "activation mode create_account depends on node build support; \
                 transfer mode is the widely supported default"
            );
        }
        Ok(Self {
            cfg,
            client,
            signer,
            telemetry,
            broadcast_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    pub fn pool_address(&self) -> TronAddress {
        self.cfg.wallet.pool_address
    }

    /// The single primary entrypoint: make `target` able to send one USDT
    /// transfer at zero cost. Never returns an error; every fault lands in
    /// the result.
    pub async fn prepare_for_usdt(&self, target: TronAddress) -> PreparationResult {
        self.prepare_with_cancel(target, CancellationToken::new())
            .await
    }

    pub async fn prepare_with_cancel(
        &self,
        target: TronAddress,
        cancel: CancellationToken,
    ) -> PreparationResult {
        let started = Instant::now();
        let deadline = started + self.cfg.plan.prepare_timeout;
        let mut ctx = PrepareCtx::new(target);

        let strategy = self.run_pipeline(target, &cancel, deadline, &mut ctx).await;
        let result = ctx.finish(strategy, started);

        self.telemetry
            .preparation(strategy_label(result.strategy), result.success, result.execution_time_ms);
        for err in &result.errors {
            self.telemetry
                .preparation_error(error_kind_label(err.kind), err.at);
        }
        tracing::info!(
            address = %target,
            strategy = strategy_label(result.strategy),
            success = result.success,
            elapsed_ms = result.execution_time_ms,
            "preparation finished"
        );
        result
    }

    async fn run_pipeline(
        &self,
        target: TronAddress,
        cancel: &CancellationToken,
        deadline: Instant,
        ctx: &mut PrepareCtx,
    ) -> Strategy {
        let pool = self.cfg.wallet.pool_address;

        // probe
        let probe = match self.client.snapshot(target).await {
            Ok(s) => s,
            Err(err) => {
                ctx.errors
                    .push(ErrorEntry::new(ErrorKind::Network, "probe", format!("{err:#}")));
                return Strategy::Failed;
            }
        };
        if probe.usdt_ready() {
            ctx.verification = VerificationReport {
                energy_ok: true,
                bandwidth_ok: true,
                activated: true,
                usdt_ready: true,
            };
            return Strategy::AlreadyReady;
        }
        if let Some(s) = interrupted(cancel, deadline, "probe", ctx) {
            return s;
        }

        // simulate (through the pool wallet when the target cannot act yet)
        let (sim, yields) = self.estimate(target, probe).await;
        ctx.warnings.extend(yields.warnings.iter().cloned());

        // plan
        let plan = build_plan(&sim, &yields, &self.cfg.plan);
        ctx.required_energy = plan.need_energy_units;
        ctx.required_bandwidth = plan.need_bandwidth_units;

        let activation_needed = !probe.activated;
        let activation_cost = if activation_needed {
            self.cfg.network.activation_cost_sun
        } else {
            0
        };
        match self.client.snapshot(pool).await {
            Ok(pool_snap) => {
                let needed = plan.total_freeze_sun().saturating_add(activation_cost);
                if pool_snap.balance_sun < needed {
                    ctx.errors.push(ErrorEntry::new(
                        ErrorKind::InsufficientFunds,
                        "plan",
                        format!(
                            "pool balance {} sun cannot cover activation + freeze {} sun",
                            pool_snap.balance_sun, needed
                        ),
                    ));
                    return Strategy::Failed;
                }
            }
            Err(err) => {
                tracing::warn!(err = %err, "pool balance unreadable; continuing");
                ctx.warnings.push("plan:pool_balance_unreadable".to_string());
            }
        }
        if let Some(s) = interrupted(cancel, deadline, "plan", ctx) {
            return s;
        }

        // activate if needed
        if activation_needed {
            let activator = Activator::new(
                self.client.clone(),
                self.signer.clone(),
                pool,
                self.cfg.network.clone(),
                self.telemetry.clone(),
            );
            let run = activator
                .activate(target, self.cfg.wallet.activation_mode, &self.broadcast_lock, cancel)
                .await;
            ctx.warnings.extend(run.warnings);
            ctx.errors.extend(run.errors);
            if run.cancelled {
                ctx.errors
                    .push(ErrorEntry::new(ErrorKind::Cancelled, "activate", "cancelled"));
                return Strategy::Cancelled;
            }
            if !run.activated {
                return Strategy::ActivationFailed;
            }
            ctx.activated = true;
        } else {
            ctx.activated = true;
        }
        if let Some(s) = interrupted(cancel, deadline, "activate", ctx) {
            return s;
        }

        // delegate ENERGY, then BANDWIDTH; failures stay independent
        let delegator = Delegator::new(
            self.client.clone(),
            self.signer.clone(),
            pool,
            self.telemetry.clone(),
        );
        let verifier = Verifier::new(self.client.clone());

        let mut satisfied = [false; 2];
        for (i, resource) in [ResourceCode::Energy, ResourceCode::Bandwidth]
            .into_iter()
            .enumerate()
        {
            let run = delegator
                .delegate(
                    target,
                    resource,
                    plan.units_for(resource),
                    plan.freeze_sun_for(resource),
                    yield_for(&yields, resource),
                    &self.broadcast_lock,
                    &verifier,
                    cancel,
                )
                .await;
            ctx.warnings.extend(run.warnings);
            ctx.errors.extend(run.errors);
            ctx.delegations.push(run.outcome);
            satisfied[i] = run.satisfied;
            if run.cancelled {
                ctx.errors
                    .push(ErrorEntry::new(ErrorKind::Cancelled, "delegate", "cancelled"));
                return Strategy::Cancelled;
            }
            if let Some(s) = interrupted(cancel, deadline, "delegate", ctx) {
                return s;
            }
        }
        let [energy_satisfied, bandwidth_satisfied] = satisfied;

        // verify + report
        let final_snap = self.client.snapshot(target).await.unwrap_or(probe);
        let energy_ok = energy_satisfied
            || final_snap.energy_available as f64 >= VERIFY_HEADROOM * ctx.required_energy as f64;
        let bandwidth_ok = bandwidth_satisfied
            || final_snap.bandwidth_available as f64
                >= VERIFY_HEADROOM * ctx.required_bandwidth as f64;
        ctx.verification = VerificationReport {
            energy_ok,
            bandwidth_ok,
            activated: final_snap.activated || ctx.activated,
            usdt_ready: final_snap.usdt_ready(),
        };

        if ctx.verification.activated && ((energy_ok && bandwidth_ok) || ctx.verification.usdt_ready)
        {
            Strategy::CompletePreparation
        } else if energy_ok || bandwidth_ok {
            Strategy::PartialPreparation
        } else {
            Strategy::Failed
        }
    }

    async fn estimate(
        &self,
        target: TronAddress,
        probe: ResourceSnapshot,
    ) -> (SimulationResult, ResourceYields) {
        let pool = self.cfg.wallet.pool_address;
        let oracle = ResourceOracle::new(self.client.clone(), self.cfg.network.clone());
        let yields = match oracle.yields(pool).await {
            Ok(y) => y,
            Err(err) => {
                tracing::warn!(err = %err, "oracle unavailable; using profile fallbacks");
                ResourceYields {
                    energy_per_trx: self.cfg.network.energy_per_trx_fallback,
                    bandwidth_per_trx: self.cfg.network.bandwidth_per_trx_fallback,
                    fees: None,
                    warnings: vec!["oracle:unavailable".to_string()],
                }
            }
        };

        let simulator = Simulator::new(
            self.client.clone(),
            self.cfg.network.clone(),
            self.cfg.plan.clone(),
            self.telemetry.clone(),
        );
        let proxy = !probe.activated;
        let from = if proxy { pool } else { target };
        let (sim, sim_warnings) = simulator
            .simulate_usdt_transfer(from, target, 1, proxy, probe.activated)
            .await;

        let mut yields = yields;
        yields.warnings.extend(sim_warnings);
        (sim, yields)
    }

    /// Read-only: the plan and its cost, with zero broadcasts.
    pub async fn dry_run(&self, target: TronAddress) -> DryRunReport {
        let pool = self.cfg.wallet.pool_address;
        let mut warnings = Vec::new();

        let probe = match self.client.snapshot(target).await {
            Ok(s) => s,
            Err(err) => {
                warnings.push(format!("probe_unavailable: {err:#}"));
                ResourceSnapshot::default()
            }
        };

        let (sim, yields) = self.estimate(target, probe).await;
        warnings.extend(yields.warnings.iter().cloned());
        let plan = build_plan(&sim, &yields, &self.cfg.plan);

        let needs_activation = !probe.activated;
        let already_ready = probe.usdt_ready();
        if already_ready {
            warnings.push("target_already_ready".to_string());
        }

        let activation_cost = if needs_activation {
            self.cfg.network.activation_cost_sun
        } else {
            0
        };
        let total_cost_sun = if already_ready {
            0
        } else {
            plan.total_freeze_sun().saturating_add(activation_cost)
        };

        let feasible = match self.client.snapshot(pool).await {
            Ok(pool_snap) => pool_snap.balance_sun >= total_cost_sun,
            Err(err) => {
                warnings.push(format!("pool_balance_unreadable: {err:#}"));
                false
            }
        };

        // Worst-case TRX burn if the transfer ran without any delegation.
        let fee_limit_sun = yields
            .fees
            .map(|fees| quote_fee_limit_sun(sim.energy_used, sim.bandwidth_used, fees));

        DryRunReport {
            target,
            needs_activation,
            simulation: sim,
            plan,
            estimated_cost_trx: total_cost_sun as f64 / SUN_PER_TRX as f64,
            fee_limit_sun,
            feasible,
            warnings,
        }
    }

    pub async fn health(&self) -> HealthReport {
        let endpoints = self.client.endpoint_health().await;
        let connected = endpoints.iter().any(|e| e.connected);
        let latest_block = endpoints.iter().map(|e| e.latest_block).max().unwrap_or(0);
        let warnings = endpoints
            .iter()
            .filter(|e| !e.connected)
            .map(|e| format!("endpoint_unreachable:{}", e.url))
            .collect();
        HealthReport {
            connected,
            latest_block,
            endpoints,
            warnings,
        }
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let pool = self.cfg.wallet.pool_address;
        let snap = self.client.snapshot(pool).await.context("pool snapshot")?;

        let usdt_balance = self.pool_usdt_balance(pool).await.unwrap_or_else(|err| {
            tracing::warn!(err = %err, "pool USDT balance unreadable");
            0
        });

        let per_transfer = self.cfg.plan.usdt_energy_per_transfer_estimate.max(1);
        Ok(StatusReport {
            pool_wallet_address: pool,
            balance_trx: snap.balance_sun as f64 / SUN_PER_TRX as f64,
            usdt_balance,
            energy_available: snap.energy_available,
            bandwidth_available: snap.bandwidth_available,
            usdt_transfers_fundable: snap.energy_available / per_transfer,
            permission_id: self.signer.permission_id(),
            control_ops_allowed: self.signer.allowed_op_names(),
            fallback_to_owner: self.cfg.wallet.fallback_to_owner,
        })
    }

    async fn pool_usdt_balance(&self, pool: TronAddress) -> Result<u64> {
        let data = tron::trc20::balance_of_calldata(pool);
        let res = self
            .client
            .trigger_constant_contract(pool, self.cfg.network.usdt_contract, &data)
            .await?;
        let Some(first) = res.constant_result.first() else {
            return Ok(0);
        };
        tron::trc20::balance_from_constant_result(first)
    }
}

fn yield_for(yields: &ResourceYields, resource: ResourceCode) -> f64 {
    match resource {
        ResourceCode::Energy => yields.energy_per_trx,
        ResourceCode::Bandwidth => yields.bandwidth_per_trx,
    }
}

fn interrupted(
    cancel: &CancellationToken,
    deadline: Instant,
    at: &'static str,
    ctx: &mut PrepareCtx,
) -> Option<Strategy> {
    if cancel.is_cancelled() {
        ctx.errors
            .push(ErrorEntry::new(ErrorKind::Cancelled, at, "preparation cancelled"));
        return Some(Strategy::Cancelled);
    }
    if Instant::now() >= deadline {
        ctx.errors.push(ErrorEntry::new(
            ErrorKind::Timeout,
            at,
            "overall preparation deadline exceeded",
        ));
        return Some(Strategy::Timeout);
    }
    None
}

/// Accumulates partial outcomes so aborts still report everything gathered.
struct PrepareCtx {
    target: TronAddress,
    activated: bool,
    required_energy: u64,
    required_bandwidth: u64,
    delegations: Vec<crate::types::DelegationOutcome>,
    verification: VerificationReport,
    warnings: Vec<String>,
    errors: Vec<ErrorEntry>,
}

impl PrepareCtx {
    fn new(target: TronAddress) -> Self {
        Self {
            target,
            activated: false,
            required_energy: 0,
            required_bandwidth: 0,
            delegations: Vec::new(),
            verification: VerificationReport::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self, strategy: Strategy, started: Instant) -> PreparationResult {
        let success = matches!(strategy, Strategy::AlreadyReady | Strategy::CompletePreparation);
        PreparationResult {
            success,
            strategy,
            target: self.target,
            execution_time_ms: started.elapsed().as_millis() as u64,
            required_energy: self.required_energy,
            required_bandwidth: self.required_bandwidth,
            delegations: self.delegations,
            verification: self.verification,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

fn strategy_label(s: Strategy) -> &'static str {
    match s {
        Strategy::AlreadyReady => "already_ready",
        Strategy::CompletePreparation => "complete_preparation",
        Strategy::PartialPreparation => "partial_preparation",
        Strategy::ActivationFailed => "activation_failed",
        Strategy::Failed => "failed",
        Strategy::Cancelled => "cancelled",
        Strategy::Timeout => "timeout",
    }
}

fn error_kind_label(k: ErrorKind) -> &'static str {
    match k {
        ErrorKind::Config => "config",
        ErrorKind::Network => "network",
        ErrorKind::Simulation => "simulation",
        ErrorKind::InsufficientFunds => "insufficient_funds",
        ErrorKind::Permission => "permission",
        ErrorKind::Broadcast => "broadcast",
        ErrorKind::VerificationTimeout => "verification_timeout",
        ErrorKind::Cancelled => "cancelled",
        ErrorKind::Timeout => "timeout",
    }
}
