use super::env::Env;
use super::parse::{
    parse_activation_mode, parse_backend, parse_csv, parse_network, parse_opt_hex_32,
    parse_ops_csv, parse_tron_address, trx_to_sun_f64,
};
use super::{
    ActivationMode, AppConfig, NetworkKind, NetworkProfile, NodeConfig, PlanConfig, WalletConfig,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// USDT TRC20 on mainnet. Testnet deployments are environment-specific and
/// must be configured explicitly.
const MAINNET_USDT_CONTRACT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

const MAINNET_DEFAULT_NODE: &str = "https://api.trongrid.io";
const TESTNET_DEFAULT_NODE: &str = "https://nile.trongrid.io";

pub fn load_config() -> Result<AppConfig> {
    let env: Env = envy::from_env().context("load gas station env config")?;
    build_config(env)
}

fn build_config(env: Env) -> Result<AppConfig> {
    let kind = parse_network(&env.tron_network)?;
    let backend = parse_backend(&env.node_backend)?;

    if env.gas_wallet_address.trim().is_empty() {
        anyhow::bail!("GAS_WALLET_ADDRESS must be set");
    }
    let pool_address = parse_tron_address("GAS_WALLET_ADDRESS", &env.gas_wallet_address)?;

    let control_key = parse_opt_hex_32(
        "GAS_WALLET_CONTROL_PRIVATE_KEY",
        &env.gas_wallet_control_private_key,
    )?;
    let owner_key = parse_opt_hex_32("GAS_WALLET_PRIVATE_KEY", &env.gas_wallet_private_key)?;
    if control_key.is_none() && owner_key.is_none() {
        anyhow::bail!(
            "GAS_WALLET_CONTROL_PRIVATE_KEY or GAS_WALLET_PRIVATE_KEY must be set"
        );
    }
    if control_key.is_none() {
        tracing::warn!(
            "no control key configured; falling back to owner-key signing for all operations"
        );
    }

    let usdt_contract = if !env.usdt_contract_address.trim().is_empty() {
        parse_tron_address("USDT_CONTRACT_ADDRESS", &env.usdt_contract_address)?
    } else if kind == NetworkKind::Mainnet {
        parse_tron_address("USDT_CONTRACT_ADDRESS", MAINNET_USDT_CONTRACT)?
    } else {
        anyhow::bail!("USDT_CONTRACT_ADDRESS must be set on testnet");
    };

    let default_node = match kind {
        NetworkKind::Mainnet => MAINNET_DEFAULT_NODE,
        NetworkKind::Testnet => TESTNET_DEFAULT_NODE,
    };
    let full_url = if env.tron_full_node_url.trim().is_empty() {
        if env.tron_local_node_enabled {
            anyhow::bail!("TRON_FULL_NODE_URL must be set when TRON_LOCAL_NODE_ENABLED=true");
        }
        default_node.to_string()
    } else {
        env.tron_full_node_url.trim().trim_end_matches('/').to_string()
    };
    let solidity_url = if env.tron_solidity_node_url.trim().is_empty() {
        full_url.clone()
    } else {
        env.tron_solidity_node_url.trim().trim_end_matches('/').to_string()
    };

    let activation_cost_sun = if env.gas_activation_cost_trx > 0.0 {
        trx_to_sun_f64(env.gas_activation_cost_trx)
    } else {
        match kind {
            NetworkKind::Mainnet => 1_500_000,
            NetworkKind::Testnet => 1_000_000,
        }
    };

    let energy_per_trx_fallback = if env.energy_units_per_trx_estimate > 0.0 {
        env.energy_units_per_trx_estimate
    } else {
        // Long-run mainnet ratio; live oracle output always wins.
        2.38
    };
    let bandwidth_per_trx_fallback = if env.bandwidth_units_per_trx_estimate > 0.0 {
        env.bandwidth_units_per_trx_estimate
    } else {
        1_000.0
    };

    Ok(AppConfig {
        network: NetworkProfile {
            kind,
            activation_cost_sun,
            usdt_contract,
            energy_per_trx_fallback,
            bandwidth_per_trx_fallback,
            bandwidth_yield_floor: 200.0,
        },
        node: NodeConfig {
            backend,
            full_url,
            solidity_url,
            remote_solidity_urls: parse_csv(&env.tron_remote_solidity_urls),
            timeout: Duration::from_secs(env.rpc_timeout_secs.max(1)),
            retries: env.rpc_retries.max(1),
        },
        wallet: WalletConfig {
            pool_address,
            control_key,
            owner_key,
            permission_id: env.gas_wallet_control_permission_id,
            fallback_to_owner: env.gas_control_fallback_to_owner,
            allowed_ops: parse_ops_csv("GAS_CONTROL_ALLOWED_OPS", &env.gas_control_allowed_ops)?,
            activation_mode: parse_activation_mode(&env.gas_account_activation_mode)?,
        },
        plan: PlanConfig {
            energy_safety: if env.delegation_safety_multiplier >= 1.0 {
                env.delegation_safety_multiplier
            } else {
                1.15
            },
            energy_margin_units: 5_000,
            bandwidth_safety: 1.25,
            min_bandwidth_units: 350,
            energy_units_floor: env.target_energy_units,
            bandwidth_units_floor: env.target_bandwidth_units,
            min_delegate_sun: tron::trx_to_sun(env.min_delegate_trx.max(1)),
            fallback_energy_existing_holder: 32_000,
            fallback_energy_new_holder: 65_000,
            fallback_bandwidth_units: env.usdt_bandwidth_per_transfer_estimate.max(1),
            usdt_energy_per_transfer_estimate: env.usdt_energy_per_transfer_estimate,
            prepare_timeout: Duration::from_secs(env.prepare_timeout_secs.max(1)),
        },
    })
}
