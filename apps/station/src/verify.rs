//! Post-broadcast verification. Solidity indexes trail the chain head by a
//! few blocks, so every poll is a multi-endpoint max read and any positive
//! movement counts as confirmation.

use crate::poll::{POLL_ATTEMPTS, POLL_INTERVAL, PollOutcome, Step, poll_until};
use crate::rpc::NodeClient;
use crate::types::ResourceSnapshot;
use tokio_util::sync::CancellationToken;
use tron::TronAddress;
use tron::api::ResourceCode;

#[derive(Debug, Clone, Copy)]
pub struct VerifyOutcome {
    pub observed_increase: bool,
    pub last: ResourceSnapshot,
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct Verifier {
    client: NodeClient,
}

impl Verifier {
    pub fn new(client: NodeClient) -> Self {
        Self { client }
    }

    /// Polls until the target's `resource` rises above `baseline`, for at
    /// most the 5-second window. Returns the last snapshot either way.
    pub async fn await_increase(
        &self,
        target: TronAddress,
        resource: ResourceCode,
        baseline: ResourceSnapshot,
        cancel: &CancellationToken,
    ) -> VerifyOutcome {
        let before = baseline.available(resource);
        let client = &self.client;
        let outcome = poll_until(POLL_INTERVAL, POLL_ATTEMPTS, cancel, move |_| async move {
            match client.snapshot(target).await {
                Ok(snap) if snap.available(resource) > before => Step::Ready(snap),
                Ok(snap) => Step::Pending(Some(snap)),
                Err(err) => {
                    tracing::debug!(err = %err, "verification poll failed; retrying");
                    Step::Pending(None)
                }
            }
        })
        .await;

        match outcome {
            PollOutcome::Satisfied(snap) => VerifyOutcome {
                observed_increase: true,
                last: snap,
                cancelled: false,
            },
            PollOutcome::Exhausted(last) => VerifyOutcome {
                observed_increase: false,
                last: last.unwrap_or(baseline),
                cancelled: false,
            },
            PollOutcome::Cancelled => VerifyOutcome {
                observed_increase: false,
                last: baseline,
                cancelled: true,
            },
        }
    }
}
