//! Live units-per-TRX yields. Re-read for every preparation; a stale yield
//! under-freezes and the delegation misses its target.

use crate::config::NetworkProfile;
use crate::rpc::NodeClient;
use anyhow::Result;
use tron::TronAddress;
use tron::resources::{
    CHAIN_PARAM_ENERGY_FEE, CHAIN_PARAM_TX_FEE_PER_BYTE, ChainFees, chain_param,
    parse_chain_fees, parse_net_stake_totals,
};

/// Raw bandwidth yields under this are index noise, not a real price.
const BANDWIDTH_YIELD_SANITY_MIN: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct ResourceYields {
    pub energy_per_trx: f64,
    pub bandwidth_per_trx: f64,
    /// Present when the fee parameters were readable; lets dry runs quote a
    /// worst-case fee limit.
    pub fees: Option<ChainFees>,
    pub warnings: Vec<String>,
}

pub struct ResourceOracle {
    client: NodeClient,
    profile: NetworkProfile,
}

impl ResourceOracle {
    pub fn new(client: NodeClient, profile: NetworkProfile) -> Self {
        Self { client, profile }
    }

    /// Computes current yields. Network failures degrade to the configured
    /// fallbacks with a warning instead of failing the preparation.
    pub async fn yields(&self, stake_probe: TronAddress) -> Result<ResourceYields> {
        let mut warnings = Vec::new();

        let params = match self.client.get_chain_parameters().await {
            Ok(p) => Some(p),
            Err(err) => {
                tracing::warn!(err = %err, "chain parameters unavailable; using fallbacks");
                warnings.push("oracle:chain_parameters_unavailable".to_string());
                None
            }
        };

        let energy_per_trx = params
            .as_ref()
            .and_then(|p| chain_param(p, CHAIN_PARAM_ENERGY_FEE))
            .filter(|fee| *fee > 0)
            .map(|fee| 1_000_000.0 / fee as f64)
            .unwrap_or_else(|| {
                warnings.push("oracle:energy_yield_fallback".to_string());
                self.profile.energy_per_trx_fallback
            });

        let mut bandwidth_per_trx = match self.net_yield_from_totals(stake_probe).await {
            Some(v) => v,
            None => params
                .as_ref()
                .and_then(|p| chain_param(p, CHAIN_PARAM_TX_FEE_PER_BYTE))
                .filter(|fee| *fee > 0)
                .map(|fee| 1_000_000.0 / fee as f64)
                .unwrap_or_else(|| {
                    warnings.push("oracle:bandwidth_yield_fallback".to_string());
                    self.profile.bandwidth_per_trx_fallback
                }),
        };

        if bandwidth_per_trx < BANDWIDTH_YIELD_SANITY_MIN {
            tracing::debug!(
                raw = bandwidth_per_trx,
                floor = self.profile.bandwidth_yield_floor,
                "bandwidth yield below sanity minimum; flooring"
            );
            bandwidth_per_trx = self.profile.bandwidth_yield_floor;
        }

        let fees = params.as_ref().and_then(|p| parse_chain_fees(p).ok());

        Ok(ResourceYields {
            energy_per_trx,
            bandwidth_per_trx,
            fees,
            warnings,
        })
    }

    /// Preferred bandwidth yield: network-wide limit over stake weight.
    async fn net_yield_from_totals(&self, probe: TronAddress) -> Option<f64> {
        let msg = self.client.get_account_resource(probe).await.ok()?;
        let totals = parse_net_stake_totals(&msg).ok()?;
        if totals.total_limit == 0 || totals.total_weight == 0 {
            return None;
        }
        Some(totals.total_limit as f64 / totals.total_weight as f64)
    }
}
