use crate::address::{ADDRESS_PREFIX, TronAddress};
use alloy::primitives::keccak256;
use anyhow::{Context, Result};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

/// A secp256k1 keypair bound to its derived Tron address.
#[derive(Clone)]
pub struct TronWallet {
    key: SigningKey,
    address: TronAddress,
}

/// A signature over a transaction's raw-data bytes.
#[derive(Debug, Clone)]
pub struct RawSignature {
    /// `sha256(raw_data_bytes)` — the transaction id.
    pub txid: [u8; 32],
    /// 65-byte recoverable signature (r ‖ s ‖ v), v = recovery id + 27.
    pub signature: [u8; 65],
}

impl TronWallet {
    pub fn new(private_key: [u8; 32]) -> Result<Self> {
        let key = SigningKey::from_bytes(&private_key.into()).context("invalid secp256k1 key")?;
        let address = derive_address(key.verifying_key());
        Ok(Self { key, address })
    }

    pub fn address(&self) -> TronAddress {
        self.address
    }

    /// Signs the SHA-256 of `raw_bytes`, the digest Tron nodes verify.
    pub fn sign_raw(&self, raw_bytes: &[u8]) -> Result<RawSignature> {
        let digest = Sha256::digest(raw_bytes);
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&digest);

        let (rec_sig, recid) = self
            .key
            .clone()
            .sign_digest_recoverable(Sha256::new_with_prefix(raw_bytes))
            .context("sign Tron tx")?;

        let mut signature = [0u8; 65];
        signature[..64].copy_from_slice(&rec_sig.to_bytes());
        signature[64] = recid.to_byte() + 27;

        Ok(RawSignature { txid, signature })
    }
}

impl std::fmt::Debug for TronWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never prints key material.
        write!(f, "TronWallet({})", self.address)
    }
}

fn derive_address(vk: &VerifyingKey) -> TronAddress {
    let point = vk.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);

    let mut raw = [0u8; 21];
    raw[0] = ADDRESS_PREFIX;
    raw[1..].copy_from_slice(&hash[12..]);
    // Prefix is set above, so this cannot fail.
    TronAddress::from_prefixed_bytes(raw).unwrap()
}
