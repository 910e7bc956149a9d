//! Poll-with-timeout primitive
//!
//! Repeatedly runs an async probe until it yields a value, a poll or time
//! budget runs out, or the cancellation token fires. Sleeping goes through
//! [`Sleeper`] so tests can observe the schedule without waiting.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Source of delays between polls and slices
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeping on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often and for how long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Give up after this many probes
    pub max_polls: Option<u32>,
    /// Give up once this much time has passed since the first probe
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
            timeout: None,
        }
    }
}

impl PollConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, polls: u32 },
    TimedOut { polls: u32 },
    Cancelled { polls: u32 },
}

impl<T> PollOutcome<T> {
    pub fn polls(&self) -> u32 {
        match self {
            PollOutcome::Ready { polls, .. }
            | PollOutcome::TimedOut { polls }
            | PollOutcome::Cancelled { polls } => *polls,
        }
    }
}

/// Run `probe` until it returns `Some`, the budget is spent, or `cancel`
/// fires. The probe receives the 1-based poll number. There is no sleep
/// after the resolving probe, and a probe error ends the loop immediately.
pub async fn poll_until<T, E, F, Fut>(
    config: &PollConfig,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = config.timeout.map(|timeout| Instant::now() + timeout);
    let mut polls = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Ok(PollOutcome::Cancelled { polls });
        }

        polls += 1;
        if let Some(value) = probe(polls).await? {
            return Ok(PollOutcome::Ready { value, polls });
        }

        if config.max_polls.is_some_and(|max| polls >= max) {
            return Ok(PollOutcome::TimedOut { polls });
        }

        let mut delay = config.interval;
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return Ok(PollOutcome::TimedOut { polls });
            }
            delay = delay.min(deadline - now);
        }

        tokio::select! {
            () = cancel.cancelled() => return Ok(PollOutcome::Cancelled { polls }),
            () = sleeper.sleep(delay) => {}
        }
    }
}
