use crate::api::{AccountResourceMessage, ChainParameters};
use anyhow::{Context, Result};

/// Key names returned by `getchainparameters`.
///
/// Tron nodes expose a list of (key,value) params. We only consume the
/// fee-related ones.
pub const CHAIN_PARAM_ENERGY_FEE: &str = "getEnergyFee";
pub const CHAIN_PARAM_TX_FEE_PER_BYTE: &str = "getTransactionFee";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFees {
    /// Sun per energy unit.
    pub energy_fee_sun_per_energy: u64,
    /// Sun per bandwidth byte.
    pub tx_fee_sun_per_byte: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountResources {
    pub energy_used: u64,
    pub energy_limit: u64,
    pub net_used: u64,
    pub net_limit: u64,
    pub free_net_used: u64,
    pub free_net_limit: u64,
}

impl AccountResources {
    pub fn energy_available(self) -> u64 {
        self.energy_limit.saturating_sub(self.energy_used)
    }

    pub fn net_available(self) -> u64 {
        self.net_limit.saturating_sub(self.net_used)
    }

    pub fn free_net_available(self) -> u64 {
        self.free_net_limit.saturating_sub(self.free_net_used)
    }

    /// Total bandwidth a transfer can draw on: staked/delegated quota plus
    /// the daily free allowance.
    pub fn bandwidth_available(self) -> u64 {
        self.net_available().saturating_add(self.free_net_available())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStakeTotals {
    /// Total resource capacity on the network (energy units or bandwidth units).
    pub total_limit: u64,
    /// Total stake weight backing this resource (in TRX for the HTTP API).
    pub total_weight: u64,
}

/// Looks up a single chain parameter by key.
pub fn chain_param(params: &ChainParameters, key: &str) -> Option<i64> {
    params
        .chain_parameter
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.value)
}

pub fn parse_chain_fees(params: &ChainParameters) -> Result<ChainFees> {
    let energy_fee = chain_param(params, CHAIN_PARAM_ENERGY_FEE)
        .context("missing chain parameter getEnergyFee")?;
    let tx_fee = chain_param(params, CHAIN_PARAM_TX_FEE_PER_BYTE)
        .context("missing chain parameter getTransactionFee")?;

    Ok(ChainFees {
        energy_fee_sun_per_energy: u64::try_from(energy_fee)
            .context("energy_fee out of range")?,
        tx_fee_sun_per_byte: u64::try_from(tx_fee).context("tx_fee_per_byte out of range")?,
    })
}

pub fn parse_account_resources(msg: &AccountResourceMessage) -> Result<AccountResources> {
    Ok(AccountResources {
        energy_used: u64::try_from(msg.energy_used).context("EnergyUsed out of range")?,
        energy_limit: u64::try_from(msg.energy_limit).context("EnergyLimit out of range")?,
        net_used: u64::try_from(msg.net_used).context("NetUsed out of range")?,
        net_limit: u64::try_from(msg.net_limit).context("NetLimit out of range")?,
        free_net_used: u64::try_from(msg.free_net_used).context("freeNetUsed out of range")?,
        free_net_limit: u64::try_from(msg.free_net_limit).context("freeNetLimit out of range")?,
    })
}

pub fn parse_net_stake_totals(msg: &AccountResourceMessage) -> Result<ResourceStakeTotals> {
    Ok(ResourceStakeTotals {
        total_limit: u64::try_from(msg.total_net_limit).context("TotalNetLimit out of range")?,
        total_weight: u64::try_from(msg.total_net_weight).context("TotalNetWeight out of range")?,
    })
}

pub fn quote_fee_limit_sun(energy_required: u64, tx_size_bytes: u64, fees: ChainFees) -> u64 {
    energy_required
        .saturating_mul(fees.energy_fee_sun_per_energy)
        .saturating_add(tx_size_bytes.saturating_mul(fees.tx_fee_sun_per_byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChainParameter;

    fn params(pairs: &[(&str, i64)]) -> ChainParameters {
        ChainParameters {
            chain_parameter: pairs
                .iter()
                .map(|(k, v)| ChainParameter {
                    key: k.to_string(),
                    value: *v,
                })
                .collect(),
        }
    }

    #[test]
    fn parse_chain_fees_extracts_expected_keys() {
        let fees =
            parse_chain_fees(&params(&[("getEnergyFee", 100), ("getTransactionFee", 1000)]))
                .unwrap();
        assert_eq!(
            fees,
            ChainFees {
                energy_fee_sun_per_energy: 100,
                tx_fee_sun_per_byte: 1000
            }
        );
    }

    #[test]
    fn parse_chain_fees_errors_if_missing() {
        assert!(parse_chain_fees(&params(&[("getEnergyFee", 1)])).is_err());
    }

    #[test]
    fn quote_fee_limit_sun_matches_formula() {
        let fees = ChainFees {
            energy_fee_sun_per_energy: 100,
            tx_fee_sun_per_byte: 1000,
        };
        assert_eq!(quote_fee_limit_sun(3, 10, fees), 3 * 100 + 10 * 1000);
    }

    #[test]
    fn parse_net_stake_totals_reads_network_wide_fields() {
        let msg = crate::api::AccountResourceMessage {
            total_net_limit: 43_200_000_000,
            total_net_weight: 216_000_000,
            ..Default::default()
        };
        let totals = parse_net_stake_totals(&msg).unwrap();
        assert_eq!(totals.total_limit, 43_200_000_000);
        assert_eq!(totals.total_weight, 216_000_000);
    }

    #[test]
    fn bandwidth_available_sums_staked_and_free_quota() {
        let r = AccountResources {
            energy_used: 0,
            energy_limit: 0,
            net_used: 40,
            net_limit: 100,
            free_net_used: 200,
            free_net_limit: 600,
        };
        assert_eq!(r.bandwidth_available(), 60 + 400);
    }
}
