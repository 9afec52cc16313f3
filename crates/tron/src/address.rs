use anyhow::{Context, Result};
use std::fmt;
use std::str::FromStr;

/// Version byte prefixing every mainnet/testnet Tron address.
pub const ADDRESS_PREFIX: u8 = 0x41;

/// A Tron account address: 20 EVM-style bytes behind a `0x41` version byte.
///
/// Always constructed through a checksum-validating path; an in-hand value is
/// known to be well-formed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    /// Parses a base58check string (34 chars, leading 'T'), verifying the
    /// embedded SHA-256d checksum.
    pub fn from_base58check(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.len() != 34 || !trimmed.starts_with('T') {
            anyhow::bail!("not a Tron base58check address: {trimmed:?}");
        }
        let bytes = bs58::decode(trimmed)
            .with_check(Some(ADDRESS_PREFIX))
            .into_vec()
            .with_context(|| format!("base58check decode {trimmed:?}"))?;
        let raw: [u8; 21] = bytes
            .as_slice()
            .try_into()
            .with_context(|| format!("decoded address has {} bytes, want 21", bytes.len()))?;
        Ok(Self(raw))
    }

    pub fn from_prefixed_bytes(raw: [u8; 21]) -> Result<Self> {
        if raw[0] != ADDRESS_PREFIX {
            anyhow::bail!("address bytes missing 0x41 prefix (got 0x{:02x})", raw[0]);
        }
        Ok(Self(raw))
    }

    pub fn from_evm(a: alloy::primitives::Address) -> Self {
        let mut raw = [0u8; 21];
        raw[0] = ADDRESS_PREFIX;
        raw[1..].copy_from_slice(a.as_slice());
        Self(raw)
    }

    pub fn prefixed_bytes(&self) -> [u8; 21] {
        self.0
    }

    pub fn evm(&self) -> alloy::primitives::Address {
        alloy::primitives::Address::from_slice(&self.0[1..])
    }

    pub fn to_base58check(&self) -> String {
        bs58::encode(&self.0).with_check().into_string()
    }

    /// Hex form ("41" + 20 bytes) accepted by nodes when `visible` is false.
    pub fn to_hex41(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for TronAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58check(s)
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58check())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({})", self.to_base58check())
    }
}

impl serde::Serialize for TronAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58check())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // USDT TRC20 mainnet contract.
    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    #[test]
    fn base58check_round_trips() {
        let a = TronAddress::from_base58check(USDT).unwrap();
        assert_eq!(a.to_base58check(), USDT);
        assert_eq!(a.prefixed_bytes()[0], ADDRESS_PREFIX);
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut s = USDT.to_string();
        s.replace_range(33..34, "u");
        assert!(TronAddress::from_base58check(&s).is_err());
    }

    #[test]
    fn rejects_wrong_length_and_prefix() {
        assert!(TronAddress::from_base58check("T123").is_err());
        assert!(TronAddress::from_base58check("1111111111111111111111111111111111").is_err());
    }

    #[test]
    fn evm_round_trips_through_prefixed_form() {
        let a = TronAddress::from_base58check(USDT).unwrap();
        let b = TronAddress::from_evm(a.evm());
        assert_eq!(a, b);
        assert_eq!(a.to_hex41().len(), 42);
        assert!(a.to_hex41().starts_with("41"));
    }
}
