//! Permission-scoped signing.
//!
//! The pool wallet's active permission lists the control key under a
//! configured permission id with a restricted operations bitmap. Every
//! signing request is authorized against that bitmap before a transaction
//! is even built; an op outside the allow-set either fails fast or falls
//! back to the owner key, depending on the process-wide mode.

use crate::config::WalletConfig;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tron::api::Transaction;
use tron::{TronAddress, TronWallet};

/// Operations the gas station may need to sign, identified by the Tron
/// contract type id used in the on-chain `operations` bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    CreateAccount,
    Transfer,
    FreezeBalanceV2,
    DelegateResource,
    UnDelegateResource,
}

impl ControlOp {
    pub fn contract_type_id(self) -> u8 {
        match self {
            ControlOp::CreateAccount => 0,
            ControlOp::Transfer => 1,
            ControlOp::FreezeBalanceV2 => 54,
            ControlOp::DelegateResource => 57,
            ControlOp::UnDelegateResource => 58,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ControlOp::CreateAccount => "create_account",
            ControlOp::Transfer => "transfer",
            ControlOp::FreezeBalanceV2 => "freeze_balance_v2",
            ControlOp::DelegateResource => "delegate_resource",
            ControlOp::UnDelegateResource => "undelegate_resource",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create_account" => Some(ControlOp::CreateAccount),
            "transfer" => Some(ControlOp::Transfer),
            "freeze_balance_v2" => Some(ControlOp::FreezeBalanceV2),
            "delegate_resource" => Some(ControlOp::DelegateResource),
            "undelegate_resource" => Some(ControlOp::UnDelegateResource),
            _ => None,
        }
    }
}

/// Active-permission operations bitmap: bit N set means contract type N is
/// allowed. Matches the 32-byte hex string stored on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpBitmap([u8; 32]);

impl OpBitmap {
    pub fn from_ops(ops: &[ControlOp]) -> Self {
        let mut bits = [0u8; 32];
        for op in ops {
            let id = op.contract_type_id() as usize;
            bits[id / 8] |= 1 << (id % 8);
        }
        Self(bits)
    }

    pub fn contains(&self, op: ControlOp) -> bool {
        let id = op.contract_type_id() as usize;
        self.0[id / 8] & (1 << (id % 8)) != 0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    ControlOnly,
    ControlWithOwnerFallback,
    OwnerOnly,
}

/// The resolved key and permission stamp for one operation.
#[derive(Debug)]
pub struct SignerGrant<'a> {
    pub wallet: &'a TronWallet,
    /// `Some` when signing under the control permission; `None` for the
    /// owner key (permission 0 is implicit).
    pub permission_id: Option<u8>,
    pub owner_fallback: bool,
}

pub struct StationSigner {
    mode: SigningMode,
    control: Option<TronWallet>,
    owner: Option<TronWallet>,
    permission_id: u8,
    allowed: OpBitmap,
    allowed_ops: Vec<ControlOp>,
}

impl StationSigner {
    pub fn from_config(cfg: &WalletConfig) -> Result<Self> {
        let control = cfg
            .control_key
            .map(TronWallet::new)
            .transpose()
            .context("init control wallet")?;
        let owner = cfg
            .owner_key
            .map(TronWallet::new)
            .transpose()
            .context("init owner wallet")?;

        let mode = match (&control, &owner, cfg.fallback_to_owner) {
            (Some(_), Some(_), true) => SigningMode::ControlWithOwnerFallback,
            (Some(_), _, _) => SigningMode::ControlOnly,
            (None, Some(_), _) => SigningMode::OwnerOnly,
            (None, None, _) => anyhow::bail!("no signing key configured"),
        };

        Ok(Self {
            mode,
            control,
            owner,
            permission_id: cfg.permission_id,
            allowed: OpBitmap::from_ops(&cfg.allowed_ops),
            allowed_ops: cfg.allowed_ops.clone(),
        })
    }

    pub fn mode(&self) -> SigningMode {
        self.mode
    }

    pub fn permission_id(&self) -> u8 {
        self.permission_id
    }

    pub fn allowed_op_names(&self) -> Vec<String> {
        self.allowed_ops.iter().map(|op| op.name().to_string()).collect()
    }

    pub fn control_address(&self) -> Option<TronAddress> {
        self.control.as_ref().map(|w| w.address())
    }

    /// Resolves the key and permission id for `op`, or fails with a
    /// permission error before anything is built or broadcast.
    pub fn authorize(&self, op: ControlOp) -> Result<SignerGrant<'_>> {
        match self.mode {
            SigningMode::OwnerOnly => {
                let wallet = self.owner.as_ref().context("owner key missing")?;
                return Ok(SignerGrant {
                    wallet,
                    permission_id: None,
                    owner_fallback: false,
                });
            }
            SigningMode::ControlOnly | SigningMode::ControlWithOwnerFallback => {}
        }

        let control = self.control.as_ref().context("control key missing")?;
        if self.allowed.contains(op) {
            return Ok(SignerGrant {
                wallet: control,
                permission_id: Some(self.permission_id),
                owner_fallback: false,
            });
        }

        if self.mode == SigningMode::ControlWithOwnerFallback
            && let Some(owner) = self.owner.as_ref()
        {
            tracing::warn!(op = op.name(), "control allow-set lacks op; using owner key");
            return Ok(SignerGrant {
                wallet: owner,
                permission_id: None,
                owner_fallback: true,
            });
        }

        anyhow::bail!(
            "operation {} is outside the control permission allow-set (permission_id={})",
            op.name(),
            self.permission_id
        )
    }

    /// Signs a node-built transaction in place and returns its txid hex.
    ///
    /// The node's `txID` must match `sha256(raw_data_hex)`; a mismatch means
    /// the endpoint altered the transaction and the signature is withheld.
    pub fn sign(&self, grant: &SignerGrant<'_>, tx: &mut Transaction) -> Result<String> {
        if !tx.has_raw() {
            anyhow::bail!("node returned no raw_data_hex to sign");
        }
        let raw = tx.raw_bytes()?;

        let digest = Sha256::digest(&raw);
        let txid_hex = hex::encode(digest);
        if !tx.tx_id.is_empty() && !tx.tx_id.eq_ignore_ascii_case(&txid_hex) {
            anyhow::bail!(
                "node txID {} does not match sha256(raw_data_hex) {}",
                tx.tx_id,
                txid_hex
            );
        }

        let sig = grant.wallet.sign_raw(&raw)?;
        tx.signature.push(hex::encode(sig.signature));
        tx.tx_id = txid_hex.clone();
        Ok(txid_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActivationMode, WalletConfig};

    fn wallet_cfg(
        control: Option<[u8; 32]>,
        owner: Option<[u8; 32]>,
        fallback: bool,
        ops: Vec<ControlOp>,
    ) -> WalletConfig {
        WalletConfig {
            pool_address: TronAddress::from_base58check("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t")
                .unwrap(),
            control_key: control,
            owner_key: owner,
            permission_id: 2,
            fallback_to_owner: fallback,
            allowed_ops: ops,
            activation_mode: ActivationMode::Transfer,
        }
    }

    #[test]
    fn bitmap_contains_exactly_the_requested_ops() {
        let b = OpBitmap::from_ops(&[ControlOp::Transfer, ControlOp::DelegateResource]);
        assert!(b.contains(ControlOp::Transfer));
        assert!(b.contains(ControlOp::DelegateResource));
        assert!(!b.contains(ControlOp::FreezeBalanceV2));
        assert!(!b.contains(ControlOp::CreateAccount));
        assert_eq!(b.to_hex().len(), 64);
    }

    #[test]
    fn authorize_grants_control_permission_for_allowed_op() {
        let signer = StationSigner::from_config(&wallet_cfg(
            Some([0x11; 32]),
            None,
            true,
            vec![ControlOp::FreezeBalanceV2, ControlOp::DelegateResource],
        ))
        .unwrap();
        assert_eq!(signer.mode(), SigningMode::ControlOnly);

        let grant = signer.authorize(ControlOp::DelegateResource).unwrap();
        assert_eq!(grant.permission_id, Some(2));
        assert!(!grant.owner_fallback);
    }

    #[test]
    fn authorize_rejects_op_outside_allow_set_without_fallback() {
        let signer = StationSigner::from_config(&wallet_cfg(
            Some([0x11; 32]),
            None,
            false,
            vec![ControlOp::FreezeBalanceV2],
        ))
        .unwrap();

        let err = signer.authorize(ControlOp::Transfer).unwrap_err().to_string();
        assert!(err.contains("outside the control permission allow-set"));
    }

    #[test]
    fn authorize_falls_back_to_owner_when_enabled() {
        let signer = StationSigner::from_config(&wallet_cfg(
            Some([0x11; 32]),
            Some([0x22; 32]),
            true,
            vec![ControlOp::FreezeBalanceV2],
        ))
        .unwrap();
        assert_eq!(signer.mode(), SigningMode::ControlWithOwnerFallback);

        let grant = signer.authorize(ControlOp::Transfer).unwrap();
        assert_eq!(grant.permission_id, None);
        assert!(grant.owner_fallback);
    }

    #[test]
    fn owner_only_mode_signs_everything_without_permission_stamp() {
        let signer =
            StationSigner::from_config(&wallet_cfg(None, Some([0x22; 32]), false, Vec::new()))
                .unwrap();
        assert_eq!(signer.mode(), SigningMode::OwnerOnly);

        let grant = signer.authorize(ControlOp::Transfer).unwrap();
        assert_eq!(grant.permission_id, None);
    }

    #[test]
    fn sign_appends_signature_and_checks_txid() {
        let signer = StationSigner::from_config(&wallet_cfg(
            Some([0x11; 32]),
            None,
            false,
            vec![ControlOp::Transfer],
        ))
        .unwrap();
        let grant = signer.authorize(ControlOp::Transfer).unwrap();

        let raw = b"raw bytes".to_vec();
        let mut tx = Transaction {
            raw_data_hex: hex::encode(&raw),
            ..Default::default()
        };
        let txid = signer.sign(&grant, &mut tx).unwrap();
        assert_eq!(tx.signature.len(), 1);
        assert_eq!(tx.signature[0].len(), 130);
        assert_eq!(tx.tx_id, txid);

        // A tampered txID is refused.
        let mut bad = Transaction {
            raw_data_hex: hex::encode(&raw),
            tx_id: "00".repeat(32),
            ..Default::default()
        };
        assert!(signer.sign(&grant, &mut bad).is_err());
    }
}
