//! Tron node client: HTTP against full/solidity endpoints, or the in-memory
//! mock. Dispatch is by backend enum, never by trait object, so call sites
//! read the same in both modes.

mod http;
mod mock;

pub use http::{Endpoint, EndpointKind};
pub use mock::{BroadcastRecord, MockAccount, MockNode};

use crate::config::{NodeBackendKind, NodeConfig};
use crate::metrics::StationTelemetry;
use crate::types::{EndpointHealth, ResourceSnapshot};
use anyhow::{Context, Result};
use std::sync::Arc;
use tron::TronAddress;
use tron::api::{
    Account, AccountResourceMessage, BroadcastResult, ChainParameters, ResourceCode, Transaction,
    TransactionInfo, TriggerConstantResult,
};

enum Backend {
    Http(http::HttpNodes),
    Mock(MockNode),
}

#[derive(Clone)]
pub struct NodeClient {
    backend: Arc<Backend>,
}

impl NodeClient {
    pub fn from_config(cfg: &NodeConfig, telemetry: StationTelemetry) -> Result<Self> {
        match cfg.backend {
            NodeBackendKind::Http => Self::http(cfg, telemetry),
            NodeBackendKind::Mock => Ok(Self::mock(MockNode::new())),
        }
    }

    pub fn http(cfg: &NodeConfig, telemetry: StationTelemetry) -> Result<Self> {
        let nodes = http::HttpNodes::new(
            cfg.full_url.clone(),
            cfg.solidity_url.clone(),
            cfg.remote_solidity_urls.clone(),
            cfg.timeout,
            cfg.retries,
            telemetry,
        )?;
        Ok(Self {
            backend: Arc::new(Backend::Http(nodes)),
        })
    }

    pub fn mock(node: MockNode) -> Self {
        Self {
            backend: Arc::new(Backend::Mock(node)),
        }
    }

    pub async fn get_account(&self, addr: TronAddress) -> Result<Option<Account>> {
        match &*self.backend {
            Backend::Http(h) => h.get_account(addr).await,
            Backend::Mock(m) => Ok(m.get_account(addr)),
        }
    }

    pub async fn get_account_resource(&self, addr: TronAddress) -> Result<AccountResourceMessage> {
        match &*self.backend {
            Backend::Http(h) => h.get_account_resource(addr).await,
            Backend::Mock(m) => Ok(m.get_account_resource(addr)),
        }
    }

    pub async fn get_chain_parameters(&self) -> Result<ChainParameters> {
        match &*self.backend {
            Backend::Http(h) => h.get_chain_parameters().await,
            Backend::Mock(m) => Ok(m.get_chain_parameters()),
        }
    }

    pub async fn trigger_constant_contract(
        &self,
        owner: TronAddress,
        contract: TronAddress,
        data: &[u8],
    ) -> Result<TriggerConstantResult> {
        match &*self.backend {
            Backend::Http(h) => h.trigger_constant_contract(owner, contract, data).await,
            Backend::Mock(m) => m.trigger_constant_contract(),
        }
    }

    pub async fn build_transfer(
        &self,
        from: TronAddress,
        to: TronAddress,
        amount_sun: u64,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        match &*self.backend {
            Backend::Http(h) => h.build_transfer(from, to, amount_sun, permission_id).await,
            Backend::Mock(m) => Ok(m.build_transfer(from, to, amount_sun, permission_id)),
        }
    }

    pub async fn build_freeze_balance_v2(
        &self,
        owner: TronAddress,
        frozen_balance_sun: u64,
        resource: ResourceCode,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        match &*self.backend {
            Backend::Http(h) => {
                h.build_freeze_balance_v2(owner, frozen_balance_sun, resource, permission_id)
                    .await
            }
            Backend::Mock(m) => {
                Ok(m.build_freeze_balance_v2(owner, frozen_balance_sun, resource, permission_id))
            }
        }
    }

    pub async fn build_delegate_resource(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        balance_sun: u64,
        resource: ResourceCode,
        lock_period_blocks: u64,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        match &*self.backend {
            Backend::Http(h) => {
                h.build_delegate_resource(
                    owner,
                    receiver,
                    balance_sun,
                    resource,
                    lock_period_blocks,
                    permission_id,
                )
                .await
            }
            Backend::Mock(m) => Ok(m.build_delegate_resource(
                owner,
                receiver,
                balance_sun,
                resource,
                lock_period_blocks,
                permission_id,
            )),
        }
    }

    pub async fn build_create_account(
        &self,
        owner: TronAddress,
        account: TronAddress,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        match &*self.backend {
            Backend::Http(h) => h.build_create_account(owner, account, permission_id).await,
            Backend::Mock(m) => Ok(m.build_create_account(owner, account, permission_id)),
        }
    }

    /// Hard failure only on transport problems; a node rejection comes back
    /// as `result=false` for the caller to surface.
    pub async fn broadcast(&self, tx: &Transaction) -> Result<BroadcastResult> {
        match &*self.backend {
            Backend::Http(h) => h.broadcast(tx).await,
            Backend::Mock(m) => m.broadcast(tx),
        }
    }

    pub async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        match &*self.backend {
            Backend::Http(h) => h.get_transaction_info(txid).await,
            Backend::Mock(m) => Ok(m.get_transaction_info(txid)),
        }
    }

    /// Multi-endpoint snapshot: local full, local solidity and remote
    /// solidity views in parallel, folded field-wise to the maximum. Fails
    /// only when every endpoint fails.
    pub async fn snapshot(&self, addr: TronAddress) -> Result<ResourceSnapshot> {
        let views: Vec<Result<ResourceSnapshot>> = match &*self.backend {
            Backend::Http(h) => h.snapshot_views(addr).await,
            Backend::Mock(m) => m.snapshot_views(addr).into_iter().map(Ok).collect(),
        };

        let mut ok = Vec::with_capacity(views.len());
        let mut last_err = None;
        for view in views {
            match view {
                Ok(v) => ok.push(v),
                Err(e) => last_err = Some(e),
            }
        }
        if ok.is_empty() {
            return Err(last_err
                .unwrap_or_else(|| anyhow::anyhow!("no endpoints configured"))
                .context("snapshot: all endpoints failed"));
        }
        Ok(ResourceSnapshot::merge_max(ok))
    }

    pub async fn endpoint_health(&self) -> Vec<EndpointHealth> {
        match &*self.backend {
            Backend::Http(h) => h.endpoint_health().await,
            Backend::Mock(m) => m.endpoint_health(),
        }
    }
}
