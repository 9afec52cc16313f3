//! Constant-contract simulation of the USDT transfer the target is being
//! prepared for. Yields the expected energy burn and the serialized size of
//! the would-be signed transaction (its bandwidth cost).

use crate::config::{NetworkProfile, PlanConfig};
use crate::metrics::StationTelemetry;
use crate::rpc::NodeClient;
use crate::types::{EXISTING_HOLDER_ENERGY_CEILING, SimulationResult};
use tron::TronAddress;

/// Energy surcharge applied when simulating through a proxy sender: the real
/// sender will be a fresh account and pays the new-holder storage premium.
const PROXY_ENERGY_PENALTY: f64 = 1.2;

pub struct Simulator {
    client: NodeClient,
    profile: NetworkProfile,
    plan: PlanConfig,
    telemetry: StationTelemetry,
}

impl Simulator {
    pub fn new(
        client: NodeClient,
        profile: NetworkProfile,
        plan: PlanConfig,
        telemetry: StationTelemetry,
    ) -> Self {
        Self {
            client,
            profile,
            plan,
            telemetry,
        }
    }

    /// Simulates `transfer(to, amount)` on the USDT contract as `from`.
    ///
    /// `proxy` marks `from` as a stand-in (the pool wallet simulating on
    /// behalf of a not-yet-activated target); its energy reading gets the
    /// new-holder penalty. `assume_existing` selects the estimate category
    /// when simulation is unusable.
    pub async fn simulate_usdt_transfer(
        &self,
        from: TronAddress,
        to: TronAddress,
        amount: u64,
        proxy: bool,
        assume_existing: bool,
    ) -> (SimulationResult, Vec<String>) {
        let data = tron::trc20::transfer_calldata(to, amount);

        let res = self
            .client
            .trigger_constant_contract(from, self.profile.usdt_contract, &data)
            .await;

        let mut warnings = Vec::new();
        match res {
            Ok(sim) if usable(&sim) => {
                let raw_energy = sim.energy_used.max(0) as u64;
                let energy_used = if proxy {
                    (raw_energy as f64 * PROXY_ENERGY_PENALTY).ceil() as u64
                } else {
                    raw_energy
                };
                let bandwidth_used = sim
                    .transaction
                    .as_ref()
                    .and_then(|tx| tx.size_with_signatures(1).ok())
                    .unwrap_or(self.plan.fallback_bandwidth_units);

                (
                    SimulationResult {
                        energy_used,
                        bandwidth_used,
                        would_succeed: true,
                        existing_holder: Some(raw_energy < EXISTING_HOLDER_ENERGY_CEILING),
                    },
                    warnings,
                )
            }
            Ok(sim) => {
                let detail = if !sim.result.message.is_empty() {
                    sim.result.message.clone()
                } else if sim.constant_result.is_empty() {
                    "empty constant result".to_string()
                } else {
                    "zero energy estimate".to_string()
                };
                tracing::warn!(message = %detail, "simulation unusable; using category estimate");
                self.telemetry.simulation_fallback("revert");
                warnings.push(format!("simulation:fallback_estimate ({detail})"));
                (self.estimate(assume_existing), warnings)
            }
            Err(err) => {
                tracing::warn!(err = %err, "simulation call failed; using category estimate");
                self.telemetry.simulation_fallback("unavailable");
                warnings.push("simulation:fallback_estimate (endpoint unavailable)".to_string());
                (self.estimate(assume_existing), warnings)
            }
        }
    }

    fn estimate(&self, assume_existing: bool) -> SimulationResult {
        let energy_used = if assume_existing {
            self.plan.fallback_energy_existing_holder
        } else {
            self.plan.fallback_energy_new_holder
        };
        SimulationResult {
            energy_used,
            bandwidth_used: self.plan.fallback_bandwidth_units,
            would_succeed: false,
            existing_holder: None,
        }
    }
}

fn usable(sim: &tron::api::TriggerConstantResult) -> bool {
    // Private networks occasionally answer energy_used=0 for calls that do
    // burn energy; trusting that would under-delegate.
    sim.result.message.is_empty() && !sim.constant_result.is_empty() && sim.energy_used > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkKind;
    use crate::rpc::MockNode;
    use std::time::Duration;

    fn profile() -> NetworkProfile {
        NetworkProfile {
            kind: NetworkKind::Testnet,
            activation_cost_sun: 1_000_000,
            usdt_contract: TronAddress::from_base58check("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t")
                .unwrap(),
            energy_per_trx_fallback: 2.38,
            bandwidth_per_trx_fallback: 1_000.0,
            bandwidth_yield_floor: 200.0,
        }
    }

    fn plan() -> PlanConfig {
        PlanConfig {
            energy_safety: 1.15,
            energy_margin_units: 5_000,
            bandwidth_safety: 1.25,
            min_bandwidth_units: 350,
            energy_units_floor: 0,
            bandwidth_units_floor: 0,
            min_delegate_sun: 1_000_000,
            fallback_energy_existing_holder: 32_000,
            fallback_energy_new_holder: 65_000,
            fallback_bandwidth_units: 345,
            usdt_energy_per_transfer_estimate: 14_650,
            prepare_timeout: Duration::from_secs(60),
        }
    }

    fn addr() -> TronAddress {
        TronAddress::from_base58check("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap()
    }

    fn simulator(mock: &MockNode) -> Simulator {
        Simulator::new(
            NodeClient::mock(mock.clone()),
            profile(),
            plan(),
            StationTelemetry::new(),
        )
    }

    #[tokio::test]
    async fn successful_simulation_reports_energy_and_measured_size() {
        let mock = MockNode::new();
        mock.set_simulated_energy(1_817);
        mock.set_simulated_raw_len(206);

        let (sim, warnings) = simulator(&mock)
            .simulate_usdt_transfer(addr(), addr(), 1, false, true)
            .await;
        assert!(warnings.is_empty());
        assert!(sim.would_succeed);
        assert_eq!(sim.energy_used, 1_817);
        assert_eq!(sim.bandwidth_used, 206 + 64);
        assert_eq!(sim.existing_holder, Some(true));
    }

    #[tokio::test]
    async fn holder_classification_splits_at_fifty_thousand() {
        let mock = MockNode::new();
        mock.set_simulated_energy(49_999);
        let (sim, _) = simulator(&mock)
            .simulate_usdt_transfer(addr(), addr(), 1, false, true)
            .await;
        assert_eq!(sim.existing_holder, Some(true));

        mock.set_simulated_energy(50_000);
        let (sim, _) = simulator(&mock)
            .simulate_usdt_transfer(addr(), addr(), 1, false, true)
            .await;
        assert_eq!(sim.existing_holder, Some(false));
    }

    #[tokio::test]
    async fn proxy_simulation_applies_new_holder_penalty() {
        let mock = MockNode::new();
        mock.set_simulated_energy(10_000);
        let (sim, _) = simulator(&mock)
            .simulate_usdt_transfer(addr(), addr(), 1, true, false)
            .await;
        assert_eq!(sim.energy_used, 12_000);
        // Classification uses the raw reading, not the padded one.
        assert_eq!(sim.existing_holder, Some(true));
    }

    #[tokio::test]
    async fn revert_falls_back_to_category_estimates() {
        let mock = MockNode::new();
        mock.set_simulation_revert("REVERT opcode executed");

        let (sim, warnings) = simulator(&mock)
            .simulate_usdt_transfer(addr(), addr(), 1, false, false)
            .await;
        assert!(!sim.would_succeed);
        assert_eq!(sim.energy_used, 65_000);
        assert_eq!(sim.bandwidth_used, 345);
        assert_eq!(sim.existing_holder, None);
        assert!(warnings[0].contains("fallback_estimate"));
    }

    #[tokio::test]
    async fn unavailable_endpoint_falls_back_to_existing_holder_estimate() {
        let mock = MockNode::new();
        mock.set_simulation_unavailable();

        let (sim, _) = simulator(&mock)
            .simulate_usdt_transfer(addr(), addr(), 1, false, true)
            .await;
        assert_eq!(sim.energy_used, 32_000);
    }
}
