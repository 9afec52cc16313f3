use crate::metrics::StationTelemetry;
use crate::types::ResourceSnapshot;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tron::TronAddress;
use tron::api::{
    Account, AccountResourceMessage, BroadcastResult, ChainParameters, NowBlock, Transaction,
    TransactionInfo, TriggerConstantResult,
};
use tron::resources::parse_account_resources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Full,
    Solidity,
    RemoteSolidity,
}

impl EndpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKind::Full => "full",
            EndpointKind::Solidity => "solidity",
            EndpointKind::RemoteSolidity => "remote_solidity",
        }
    }

    fn account_path(self) -> &'static str {
        match self {
            EndpointKind::Full => "/wallet/getaccount",
            // Confirmed view on solidity nodes.
            EndpointKind::Solidity | EndpointKind::RemoteSolidity => "/walletsolidity/getaccount",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    pub kind: EndpointKind,
    pub base_url: String,
}

pub struct HttpNodes {
    client: reqwest::Client,
    endpoints: Vec<Endpoint>,
    timeout: Duration,
    retries: u32,
    telemetry: StationTelemetry,
}

impl HttpNodes {
    pub fn new(
        full_url: String,
        solidity_url: String,
        remote_solidity_urls: Vec<String>,
        timeout: Duration,
        retries: u32,
        telemetry: StationTelemetry,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;

        let mut endpoints = vec![Endpoint {
            kind: EndpointKind::Full,
            base_url: full_url,
        }];
        if !solidity_url.is_empty() && solidity_url != endpoints[0].base_url {
            endpoints.push(Endpoint {
                kind: EndpointKind::Solidity,
                base_url: solidity_url,
            });
        }
        for url in remote_solidity_urls {
            endpoints.push(Endpoint {
                kind: EndpointKind::RemoteSolidity,
                base_url: url,
            });
        }

        Ok(Self {
            client,
            endpoints,
            timeout,
            retries,
            telemetry,
        })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    fn full_url(&self) -> &str {
        &self.endpoints[0].base_url
    }

    /// POST with per-call timeout and bounded retries. 4xx responses are
    /// node verdicts and returned as-is for the caller to interpret; only
    /// transport errors and 5xx are retried.
    async fn post_json<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        body: &Value,
        op: &'static str,
    ) -> Result<T> {
        let url = format!("{base_url}{path}");
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 0..self.retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            }
            let started = Instant::now();
            let resp = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(body)
                .send()
                .await;
            let ms = started.elapsed().as_millis() as u64;

            match resp {
                Ok(resp) if resp.status().is_server_error() => {
                    self.telemetry.node_http_ms(op, false, ms);
                    last_err = Some(anyhow::anyhow!("{op}: http status {}", resp.status()));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.context("read node response body")?;
                    if !status.is_success() {
                        self.telemetry.node_http_ms(op, false, ms);
                        anyhow::bail!("{op}: http status {status}: {text}");
                    }
                    self.telemetry.node_http_ms(op, true, ms);
                    return serde_json::from_str(&text)
                        .with_context(|| format!("{op}: malformed node response"));
                }
                Err(err) => {
                    self.telemetry.node_http_ms(op, false, ms);
                    last_err = Some(anyhow::Error::new(err).context(op));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{op}: no attempts made")))
    }

    pub async fn get_account(&self, addr: TronAddress) -> Result<Option<Account>> {
        self.get_account_on(self.endpoints[0].clone(), addr).await
    }

    async fn get_account_on(&self, ep: Endpoint, addr: TronAddress) -> Result<Option<Account>> {
        let body = json!({"address": addr.to_base58check(), "visible": true});
        let account: Account = self
            .post_json(&ep.base_url, ep.kind.account_path(), &body, "get_account")
            .await?;
        Ok(account.exists().then_some(account))
    }

    pub async fn get_account_resource(
        &self,
        addr: TronAddress,
    ) -> Result<AccountResourceMessage> {
        self.get_account_resource_on(self.endpoints[0].clone(), addr)
            .await
    }

    async fn get_account_resource_on(
        &self,
        ep: Endpoint,
        addr: TronAddress,
    ) -> Result<AccountResourceMessage> {
        let body = json!({"address": addr.to_base58check(), "visible": true});
        self.post_json(
            &ep.base_url,
            "/wallet/getaccountresource",
            &body,
            "get_account_resource",
        )
        .await
    }

    pub async fn get_chain_parameters(&self) -> Result<ChainParameters> {
        self.post_json(
            self.full_url(),
            "/wallet/getchainparameters",
            &json!({}),
            "get_chain_parameters",
        )
        .await
    }

    pub async fn trigger_constant_contract(
        &self,
        owner: TronAddress,
        contract: TronAddress,
        data: &[u8],
    ) -> Result<TriggerConstantResult> {
        let body = json!({
            "owner_address": owner.to_base58check(),
            "contract_address": contract.to_base58check(),
            "data": hex::encode(data),
            "visible": true,
        });
        self.post_json(
            self.full_url(),
            "/wallet/triggerconstantcontract",
            &body,
            "trigger_constant_contract",
        )
        .await
    }

    async fn build(&self, path: &str, body: Value, op: &'static str) -> Result<Transaction> {
        let raw: Value = self.post_json(self.full_url(), path, &body, op).await?;
        if let Some(err) = raw.get("Error").and_then(Value::as_str) {
            anyhow::bail!("{op}: node refused to build transaction: {err}");
        }
        let tx: Transaction =
            serde_json::from_value(raw).with_context(|| format!("{op}: parse transaction"))?;
        if !tx.has_raw() {
            anyhow::bail!("{op}: node returned no raw_data");
        }
        Ok(tx)
    }

    pub async fn build_transfer(
        &self,
        from: TronAddress,
        to: TronAddress,
        amount_sun: u64,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        let mut body = json!({
            "owner_address": from.to_base58check(),
            "to_address": to.to_base58check(),
            "amount": amount_sun,
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.build("/wallet/createtransaction", body, "build_transfer")
            .await
    }

    pub async fn build_freeze_balance_v2(
        &self,
        owner: TronAddress,
        frozen_balance_sun: u64,
        resource: tron::api::ResourceCode,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        let mut body = json!({
            "owner_address": owner.to_base58check(),
            "frozen_balance": frozen_balance_sun,
            "resource": resource.as_str(),
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.build("/wallet/freezebalancev2", body, "build_freeze_balance_v2")
            .await
    }

    pub async fn build_delegate_resource(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        balance_sun: u64,
        resource: tron::api::ResourceCode,
        lock_period_blocks: u64,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        let mut body = json!({
            "owner_address": owner.to_base58check(),
            "receiver_address": receiver.to_base58check(),
            "balance": balance_sun,
            "resource": resource.as_str(),
            "lock": true,
            "lock_period": lock_period_blocks,
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.build("/wallet/delegateresource", body, "build_delegate_resource")
            .await
    }

    pub async fn build_create_account(
        &self,
        owner: TronAddress,
        account: TronAddress,
        permission_id: Option<u8>,
    ) -> Result<Transaction> {
        let mut body = json!({
            "owner_address": owner.to_base58check(),
            "account_address": account.to_base58check(),
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.build("/wallet/createaccount", body, "build_create_account")
            .await
    }

    pub async fn broadcast(&self, tx: &Transaction) -> Result<BroadcastResult> {
        let body = serde_json::to_value(tx).context("serialize signed transaction")?;
        let started = Instant::now();
        let res: Result<BroadcastResult> = self
            .post_json(
                self.full_url(),
                "/wallet/broadcasttransaction",
                &body,
                "broadcast",
            )
            .await;
        let ms = started.elapsed().as_millis() as u64;
        match &res {
            Ok(r) => self.telemetry.broadcast_ms(r.result, ms),
            Err(_) => self.telemetry.broadcast_ms(false, ms),
        }
        res
    }

    pub async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        let body = json!({"value": txid, "visible": true});
        self.post_json(
            self.full_url(),
            "/wallet/gettransactioninfobyid",
            &body,
            "get_transaction_info",
        )
        .await
    }

    /// One snapshot view per endpoint; failed endpoints are dropped. The
    /// caller folds the views, so a lagging index never lowers the result.
    pub async fn snapshot_views(&self, addr: TronAddress) -> Vec<Result<ResourceSnapshot>> {
        let reads = self.endpoints.iter().cloned().map(|ep| self.view_on(ep, addr));
        futures::future::join_all(reads).await
    }

    async fn view_on(&self, ep: Endpoint, addr: TronAddress) -> Result<ResourceSnapshot> {
        let account = self.get_account_on(ep.clone(), addr).await?;
        let resources = self.get_account_resource_on(ep, addr).await?;
        let parsed = parse_account_resources(&resources)?;
        Ok(ResourceSnapshot {
            activated: account.is_some(),
            balance_sun: account
                .map(|a| u64::try_from(a.balance).unwrap_or(0))
                .unwrap_or(0),
            energy_available: parsed.energy_available(),
            bandwidth_available: parsed.bandwidth_available(),
        })
    }

    pub async fn endpoint_health(&self) -> Vec<crate::types::EndpointHealth> {
        let probes = self.endpoints.iter().cloned().map(|ep| async move {
            let started = Instant::now();
            let res: Result<NowBlock> = self
                .post_json(&ep.base_url, "/wallet/getnowblock", &json!({}), "get_now_block")
                .await;
            let latency_ms = started.elapsed().as_millis() as u64;
            match res {
                Ok(block) => crate::types::EndpointHealth {
                    node_type: ep.kind.as_str().to_string(),
                    url: ep.base_url,
                    connected: true,
                    latest_block: block.number(),
                    latency_ms,
                },
                Err(_) => crate::types::EndpointHealth {
                    node_type: ep.kind.as_str().to_string(),
                    url: ep.base_url,
                    connected: false,
                    latest_block: 0,
                    latency_ms,
                },
            }
        });
        futures::future::join_all(probes).await
    }
}

fn stamp_permission(body: &mut Value, permission_id: Option<u8>) {
    if let (Some(id), Some(map)) = (permission_id, body.as_object_mut()) {
        map.insert("Permission_id".to_string(), json!(id));
    }
}
