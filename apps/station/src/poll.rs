//! Shared polling primitive. Verification and activation waits both run the
//! same 500 ms cadence with cooperative cancellation; neither hand-rolls
//! sleeps.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const POLL_ATTEMPTS: u32 = 10;

/// One observation from the polled closure.
pub enum Step<T> {
    /// Condition met; stop polling.
    Ready(T),
    /// Not yet; remember the observation (if any) and keep going.
    Pending(Option<T>),
}

pub enum PollOutcome<T> {
    Satisfied(T),
    /// Attempts exhausted; carries the last pending observation.
    Exhausted(Option<T>),
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn cancelled(&self) -> bool {
        matches!(self, PollOutcome::Cancelled)
    }
}

/// Runs `f` immediately and then every `interval`, at most `attempts` times.
/// Cancellation is honored at every suspension point; a cancelled poll stops
/// without a further observation.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    attempts: u32,
    cancel: &CancellationToken,
    mut f: F,
) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Step<T>>,
{
    let mut last = None;
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }
        match f(attempt).await {
            Step::Ready(v) => return PollOutcome::Satisfied(v),
            Step::Pending(v) => {
                if v.is_some() {
                    last = v;
                }
            }
        }
    }
    PollOutcome::Exhausted(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn satisfies_as_soon_as_ready() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let out = poll_until(POLL_INTERVAL, POLL_ATTEMPTS, &cancel, move |attempt| {
            calls2.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt >= 3 {
                    Step::Ready(attempt)
                } else {
                    Step::Pending(Some(attempt))
                }
            }
        })
        .await;

        match out {
            PollOutcome::Satisfied(v) => assert_eq!(v, 3),
            _ => panic!("expected satisfied"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_observation() {
        let cancel = CancellationToken::new();
        let out = poll_until(POLL_INTERVAL, POLL_ATTEMPTS, &cancel, |attempt| async move {
            Step::Pending(Some(attempt))
        })
        .await;

        match out {
            PollOutcome::Exhausted(Some(v)) => assert_eq!(v, POLL_ATTEMPTS - 1),
            _ => panic!("expected exhausted with observation"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling_immediately() {
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();
        let out = poll_until(POLL_INTERVAL, POLL_ATTEMPTS, &cancel, move |attempt| {
            let cancel = cancel2.clone();
            async move {
                if attempt == 1 {
                    cancel.cancel();
                }
                Step::Pending(None::<u32>)
            }
        })
        .await;
        assert!(out.cancelled());
    }
}
