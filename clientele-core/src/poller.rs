//! Confirmation poller.
//!
//! Repeatedly asks a caller-supplied lookup for the hash of a submitted
//! transaction. The wait between lookups grows by the configured back-off
//! factor up to a ceiling, and the loop ends when a hash is found or the
//! accumulated wait reaches the total budget.
//!
//! A lookup answering `Ok(None)` means "not available yet" and polling goes
//! on. A lookup answering `Err(_)` means the remote call itself failed; that
//! error is returned to the caller immediately and never retried here.
//!
//! Cancellation follows the same `watch::Receiver<bool>` shutdown signal
//! used by the long running tasks of the CLI: it is checked before every
//! lookup and before every wait, and it interrupts a wait in progress.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{PollConfig, PollConfigError};
use crate::utils::backoff::next_interval;

/// Terminal outcome of a polling operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<H> {
    /// The lookup produced a hash.
    Found(H),
    /// The total wait budget was used up without a hash.
    TimedOut,
}

impl<H> PollResult<H> {
    /// The hash, if one was found.
    pub fn found(self) -> Option<H> {
        match self {
            PollResult::Found(hash) => Some(hash),
            PollResult::TimedOut => None,
        }
    }
}

/// Errors that end a polling operation early.
#[derive(Debug, Error)]
pub enum PollError<E> {
    /// The lookup itself failed.
    #[error("status lookup failed: {0}")]
    Lookup(#[source] E),

    /// The shutdown signal fired.
    #[error("polling cancelled")]
    Cancelled,

    /// The polling bounds are unusable.
    #[error("invalid polling configuration: {0}")]
    InvalidConfig(PollConfigError),
}

/// Progress of a single polling operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PollState {
    elapsed: Duration,
    interval: Duration,
    terminal: bool,
}

impl PollState {
    /// Fresh state: nothing waited yet, interval at its initial value.
    pub fn new(config: &PollConfig) -> Self {
        Self {
            elapsed: Duration::ZERO,
            interval: config.initial_interval,
            terminal: false,
        }
    }

    /// Total time waited so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The wait that follows the next unsuccessful lookup.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a terminal outcome has been reached.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Whether another lookup is allowed.
    pub fn has_budget(&self, config: &PollConfig) -> bool {
        !self.terminal && self.elapsed < config.max_total
    }

    /// Account for a completed wait of the current interval and grow the
    /// interval for the next one.
    pub fn record_wait(&mut self, config: &PollConfig) {
        self.elapsed += self.interval;
        self.interval = next_interval(self.interval, config.back_off_factor, config.max_interval);
    }

    fn finish(&mut self) {
        self.terminal = true;
    }
}

/// Drives confirmation polling loops.
///
/// One poller can serve any number of concurrent polling operations; each
/// call to [`poll_for_hash`](Self::poll_for_hash) owns its own [`PollState`].
#[derive(Debug, Clone)]
pub struct ConfirmationPoller {
    config: PollConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl ConfirmationPoller {
    /// Create a poller that stops when `shutdown_rx` turns `true`.
    ///
    /// The config is validated here since its fields are public: a zero
    /// initial interval would never use up the budget, and an initial
    /// interval above the maximum would break the interval ceiling.
    pub fn new(
        config: PollConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Self, PollConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            shutdown_rx,
        })
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `lookup` until it yields a hash or the wait budget is exhausted.
    ///
    /// The lookup is called immediately, then after waits of
    /// `initial_interval`, `initial_interval * factor`, … (each capped at
    /// `max_interval`) for as long as the accumulated wait stays below
    /// `max_total`.
    pub async fn poll_for_hash<F, Fut, H, E>(
        &self,
        mut lookup: F,
    ) -> Result<PollResult<H>, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<H>, E>>,
    {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut state = PollState::new(&self.config);

        while state.has_budget(&self.config) {
            ensure_running(&shutdown_rx)?;

            debug!(elapsed_secs = state.elapsed().as_secs_f64(), "Polling for transaction hash");
            if let Some(hash) = lookup().await.map_err(PollError::Lookup)? {
                state.finish();
                info!(
                    elapsed_secs = state.elapsed().as_secs_f64(),
                    "Transaction hash available"
                );
                return Ok(PollResult::Found(hash));
            }

            ensure_running(&shutdown_rx)?;

            info!(
                interval_secs = state.interval().as_secs_f64(),
                elapsed_secs = state.elapsed().as_secs_f64(),
                max_total_secs = self.config.max_total.as_secs_f64(),
                "Transaction hash not available yet, waiting before polling again"
            );
            tokio::select! {
                biased;

                _ = cancelled(&mut shutdown_rx) => {
                    info!("Polling cancelled during wait");
                    return Err(PollError::Cancelled);
                }

                _ = tokio::time::sleep(state.interval()) => {}
            }
            state.record_wait(&self.config);
        }

        state.finish();
        warn!(
            elapsed_secs = state.elapsed().as_secs_f64(),
            "Timed out polling for transaction hash"
        );
        Ok(PollResult::TimedOut)
    }
}

/// Poll without an external cancellation signal.
pub async fn poll_for_hash<F, Fut, H, E>(
    lookup: F,
    config: PollConfig,
) -> Result<PollResult<H>, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<H>, E>>,
{
    // A closed channel never reports cancellation.
    let (_, shutdown_rx) = watch::channel(false);
    ConfirmationPoller::new(config, shutdown_rx)
        .map_err(PollError::InvalidConfig)?
        .poll_for_hash(lookup)
        .await
}

fn ensure_running<E>(shutdown_rx: &watch::Receiver<bool>) -> Result<(), PollError<E>> {
    if *shutdown_rx.borrow() {
        info!("Polling cancelled");
        return Err(PollError::Cancelled);
    }
    Ok(())
}

/// Resolves once the shutdown flag is `true`. Pends forever when the sender
/// is gone.
async fn cancelled(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tokio::time::Instant;

    #[derive(Debug, Error, PartialEq, Eq)]
    #[error("remote unavailable")]
    struct RemoteDown;

    fn config(max_total: u64, max_interval: u64, initial: u64, factor: f64) -> PollConfig {
        PollConfig::from_secs(max_total as f64, max_interval as f64, initial as f64, factor)
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_found_on_third_lookup() {
        let start = Instant::now();
        let mut calls = 0;
        let result = poll_for_hash(
            || {
                calls += 1;
                let n = calls;
                async move { Ok::<_, Infallible>((n == 3).then(|| "0xabc".to_string())) }
            },
            config(480, 30, 1, 2.0),
        )
        .await
        .unwrap();

        assert_eq!(result, PollResult::Found("0xabc".to_string()));
        assert_eq!(calls, 3);
        // 1 s + 2 s, no wait after the successful lookup.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_found_immediately_does_not_wait() {
        let start = Instant::now();
        let result = poll_for_hash(
            || async { Ok::<_, Infallible>(Some(7u32)) },
            PollConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(result, PollResult::Found(7));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_budget() {
        let start = Instant::now();
        let mut calls = 0;
        let result = poll_for_hash(
            || {
                calls += 1;
                async { Ok::<Option<String>, Infallible>(None) }
            },
            config(10, 30, 4, 2.0),
        )
        .await
        .unwrap();

        assert_eq!(result, PollResult::TimedOut);
        // Waits of 4 s and 8 s; 12 s >= 10 s ends the loop.
        assert_eq!(calls, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_is_propagated() {
        let start = Instant::now();
        let mut calls = 0;
        let result = poll_for_hash(
            || {
                calls += 1;
                let n = calls;
                async move {
                    if n == 2 {
                        Err(RemoteDown)
                    } else {
                        Ok(None::<String>)
                    }
                }
            },
            config(480, 30, 1, 2.0),
        )
        .await;

        assert!(matches!(result, Err(PollError::Lookup(RemoteDown))));
        assert_eq!(calls, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = ConfirmationPoller::new(config(3600, 600, 600, 2.0), shutdown_rx).unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = shutdown_tx.send(true);
        });

        let start = Instant::now();
        let result = poller
            .poll_for_hash(|| async { Ok::<Option<String>, Infallible>(None) })
            .await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_lookup() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        let poller = ConfirmationPoller::new(PollConfig::default(), shutdown_rx).unwrap();

        let mut calls = 0;
        let result = poller
            .poll_for_hash(|| {
                calls += 1;
                async { Ok::<Option<String>, Infallible>(None) }
            })
            .await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_polls_are_independent() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = ConfirmationPoller::new(config(480, 30, 1, 2.0), shutdown_rx).unwrap();

        let start = Instant::now();
        let (fast, slow) = tokio::join!(
            poller.poll_for_hash(|| async { Ok::<_, Infallible>(Some("fast")) }),
            poller.poll_for_hash({
                let mut calls = 0;
                move || {
                    calls += 1;
                    let n = calls;
                    async move { Ok::<_, Infallible>((n == 4).then_some("slow")) }
                }
            }),
        );

        assert_eq!(fast.unwrap(), PollResult::Found("fast"));
        assert_eq!(slow.unwrap(), PollResult::Found("slow"));
        // 1 + 2 + 4 for the slow one.
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[test]
    fn test_interval_never_exceeds_max() {
        let config = config(u32::MAX as u64, 30, 1, 3.0);
        let mut state = PollState::new(&config);
        let mut previous = state.interval();
        for _ in 0..200 {
            state.record_wait(&config);
            assert!(state.interval() <= config.max_interval);
            assert!(state.interval() >= previous);
            previous = state.interval();
        }
        assert_eq!(state.interval(), config.max_interval);
    }

    #[test]
    fn test_elapsed_grows_by_actual_interval() {
        let config = config(480, 30, 1, 2.0);
        let mut state = PollState::new(&config);
        let mut expected = Duration::ZERO;
        for wait in [1, 2, 4, 8, 16, 30, 30] {
            assert_eq!(state.interval(), Duration::from_secs(wait));
            state.record_wait(&config);
            expected += Duration::from_secs(wait);
            assert_eq!(state.elapsed(), expected);
        }
        assert!(!state.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_interval_above_max_is_rejected() {
        let config = PollConfig {
            max_total: Duration::from_secs(100),
            max_interval: Duration::from_secs(5),
            initial_interval: Duration::from_secs(60),
            back_off_factor: 2.0,
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        assert!(matches!(
            ConfirmationPoller::new(config, shutdown_rx),
            Err(PollConfigError::InitialExceedsMax { .. })
        ));

        let start = Instant::now();
        let mut calls = 0;
        let result = poll_for_hash(
            || {
                calls += 1;
                let n = calls;
                async move { Ok::<_, Infallible>((n == 2).then_some("0xabc")) }
            },
            config,
        )
        .await;

        assert!(matches!(
            result,
            Err(PollError::InvalidConfig(PollConfigError::InitialExceedsMax { .. }))
        ));
        assert_eq!(calls, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_initial_interval_is_rejected() {
        let config = PollConfig {
            initial_interval: Duration::ZERO,
            ..PollConfig::default()
        };
        let mut calls = 0;
        let result = tokio::time::timeout(
            Duration::from_secs(3600),
            poll_for_hash(
                || {
                    calls += 1;
                    async { Ok::<Option<String>, Infallible>(None) }
                },
                config,
            ),
        )
        .await
        .expect("polling with a zero interval must not spin");

        assert!(matches!(
            result,
            Err(PollError::InvalidConfig(PollConfigError::NotPositive { .. }))
        ));
        assert_eq!(calls, 0);
    }
}
