//! Account activation. A TRC20 token cannot land on an address that does not
//! exist on-chain yet; the station creates it either by sending a small TRX
//! transfer or by issuing an explicit account-creation contract.

use crate::config::{ActivationMode, NetworkProfile};
use crate::metrics::StationTelemetry;
use crate::poll::{POLL_ATTEMPTS, POLL_INTERVAL, PollOutcome, Step, poll_until};
use crate::rpc::NodeClient;
use crate::signer::{ControlOp, StationSigner};
use crate::types::{ErrorEntry, ErrorKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tron::TronAddress;

#[derive(Debug)]
pub struct ActivationRun {
    pub activated: bool,
    pub txid: Option<String>,
    pub cancelled: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<ErrorEntry>,
}

impl ActivationRun {
    fn failed() -> Self {
        Self {
            activated: false,
            txid: None,
            cancelled: false,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

pub struct Activator {
    client: NodeClient,
    signer: Arc<StationSigner>,
    pool: TronAddress,
    profile: NetworkProfile,
    telemetry: StationTelemetry,
}

impl Activator {
    pub fn new(
        client: NodeClient,
        signer: Arc<StationSigner>,
        pool: TronAddress,
        profile: NetworkProfile,
        telemetry: StationTelemetry,
    ) -> Self {
        Self {
            client,
            signer,
            pool,
            profile,
            telemetry,
        }
    }

    pub async fn activate(
        &self,
        target: TronAddress,
        mode: ActivationMode,
        broadcast_lock: &tokio::sync::Mutex<()>,
        cancel: &CancellationToken,
    ) -> ActivationRun {
        let mut run = ActivationRun::failed();
        let mode_label: &'static str = match mode {
            ActivationMode::Transfer => "transfer",
            ActivationMode::CreateAccount => "create_account",
        };

        let op = match mode {
            ActivationMode::Transfer => ControlOp::Transfer,
            ActivationMode::CreateAccount => ControlOp::CreateAccount,
        };
        let grant = match self.signer.authorize(op) {
            Ok(g) => g,
            Err(err) => {
                run.errors
                    .push(ErrorEntry::new(ErrorKind::Permission, "activate", err.to_string()));
                self.telemetry.activation(mode_label, false);
                return run;
            }
        };

        let broadcast_res = {
            let _guard = broadcast_lock.lock().await;
            async {
                let mut tx = match mode {
                    ActivationMode::Transfer => {
                        self.client
                            .build_transfer(
                                self.pool,
                                target,
                                self.profile.activation_cost_sun,
                                grant.permission_id,
                            )
                            .await?
                    }
                    ActivationMode::CreateAccount => {
                        self.client
                            .build_create_account(self.pool, target, grant.permission_id)
                            .await?
                    }
                };
                let txid = self.signer.sign(&grant, &mut tx)?;
                let res = self.client.broadcast(&tx).await?;
                anyhow::Ok((txid, res))
            }
            .await
        };

        let txid = match broadcast_res {
            Ok((txid, res)) if res.result => {
                run.txid = Some(txid.clone());
                txid
            }
            Ok((txid, res)) => {
                run.txid = Some(txid);
                run.errors.push(ErrorEntry::new(
                    ErrorKind::Broadcast,
                    "activate",
                    format!("activation rejected: {} {}", res.code, res.decoded_message()),
                ));
                self.telemetry.activation(mode_label, false);
                return run;
            }
            Err(err) => {
                // Not every node build ships AccountCreateContract; that
                // refusal is a configuration problem, not a network one.
                let entry = if mode == ActivationMode::CreateAccount
                    && format!("{err:#}").contains("refused to build")
                {
                    ErrorEntry::new(
                        ErrorKind::Config,
                        "activate",
                        "create_account is not supported by this node build; use transfer mode",
                    )
                } else {
                    ErrorEntry::new(ErrorKind::Network, "activate", format!("{err:#}"))
                };
                run.errors.push(entry);
                self.telemetry.activation(mode_label, false);
                return run;
            }
        };

        // The account appearing (or carrying balance) is the real signal;
        // transaction-info confirmation often trails it.
        let client = &self.client;
        let wait = poll_until(POLL_INTERVAL, POLL_ATTEMPTS, cancel, move |_| async move {
            match client.get_account(target).await {
                Ok(Some(account)) if account.exists() => Step::Ready(()),
                Ok(_) => Step::Pending(None),
                Err(err) => {
                    tracing::debug!(err = %err, "activation poll failed; retrying");
                    Step::Pending(None)
                }
            }
        })
        .await;

        match wait {
            PollOutcome::Satisfied(()) => {
                run.activated = true;
                match self.client.get_transaction_info(&txid).await {
                    Ok(info) if info.confirmed() => {}
                    _ => {
                        run.warnings.push("activation:unconfirmed_broadcast".to_string());
                    }
                }
            }
            PollOutcome::Exhausted(_) => {
                // One more chance: the broadcast may have confirmed even if
                // no read caught the account yet.
                let confirmed = self
                    .client
                    .get_transaction_info(&txid)
                    .await
                    .map(|info| info.succeeded())
                    .unwrap_or(false);
                if confirmed {
                    run.activated = true;
                    run.warnings.push("activation:account_index_lag".to_string());
                } else {
                    run.errors.push(ErrorEntry::new(
                        ErrorKind::VerificationTimeout,
                        "activate",
                        "account did not appear within the confirmation window",
                    ));
                }
            }
            PollOutcome::Cancelled => {
                run.cancelled = true;
            }
        }

        self.telemetry.activation(mode_label, run.activated);
        run
    }
}
