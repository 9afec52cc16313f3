use super::{ActivationMode, NetworkKind, NodeBackendKind};
use crate::signer::ControlOp;
use anyhow::{Context, Result};
use tron::TronAddress;

pub(super) fn parse_network(raw: &str) -> Result<NetworkKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "mainnet" => Ok(NetworkKind::Mainnet),
        "testnet" | "nile" | "shasta" => Ok(NetworkKind::Testnet),
        other => anyhow::bail!("TRON_NETWORK must be mainnet or testnet, got {other:?}"),
    }
}

pub(super) fn parse_backend(raw: &str) -> Result<NodeBackendKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "http" => Ok(NodeBackendKind::Http),
        "mock" => Ok(NodeBackendKind::Mock),
        other => anyhow::bail!("NODE_BACKEND must be http or mock, got {other:?}"),
    }
}

pub(super) fn parse_activation_mode(raw: &str) -> Result<ActivationMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "transfer" => Ok(ActivationMode::Transfer),
        "create_account" => Ok(ActivationMode::CreateAccount),
        other => {
            anyhow::bail!("GAS_ACCOUNT_ACTIVATION_MODE must be transfer or create_account, got {other:?}")
        }
    }
}

pub(super) fn parse_tron_address(name: &str, raw: &str) -> Result<TronAddress> {
    TronAddress::from_base58check(raw).with_context(|| format!("parse {name}"))
}

pub(super) fn parse_hex_32(name: &str, raw: &str) -> Result<[u8; 32]> {
    let cleaned = raw.trim().trim_start_matches("0x");
    let bytes = hex::decode(cleaned).with_context(|| format!("{name} is not hex"))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("{name} must be 32 bytes, got {}", bytes.len()))
}

pub(super) fn parse_opt_hex_32(name: &str, raw: &str) -> Result<Option<[u8; 32]>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_hex_32(name, raw).map(Some)
}

pub(super) fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(super) fn parse_ops_csv(name: &str, raw: &str) -> Result<Vec<ControlOp>> {
    let mut out = Vec::new();
    for item in parse_csv(raw) {
        let op = ControlOp::from_name(&item)
            .with_context(|| format!("{name}: unknown operation {item:?}"))?;
        if !out.contains(&op) {
            out.push(op);
        }
    }
    Ok(out)
}

pub(super) fn trx_to_sun_f64(trx: f64) -> u64 {
    if trx <= 0.0 {
        return 0;
    }
    (trx * 1_000_000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_32_accepts_0x_prefix() {
        let k = parse_hex_32("K", &format!("0x{}", "11".repeat(32))).unwrap();
        assert_eq!(k, [0x11; 32]);
        assert!(parse_hex_32("K", "11").is_err());
    }

    #[test]
    fn parse_csv_trims_and_drops_empties() {
        assert_eq!(parse_csv(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn trx_to_sun_rounds_half_trx() {
        assert_eq!(trx_to_sun_f64(1.5), 1_500_000);
        assert_eq!(trx_to_sun_f64(0.0), 0);
    }
}
