//! Every suspension of a query goes through one [`Sleeper`].

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Sleeps for `duration`, returning [`Error::Cancelled`] as soon as
    /// `cancel` fires.
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// Budget waits and the fixed courtesy delay between requests.
#[derive(Debug, Clone)]
pub struct PacingPolicy {
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl PacingPolicy {
    pub fn new(delay: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { delay, sleeper }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// Delay after a successful request. Skipped entirely when zero.
    pub async fn pace(&self, cancel: &CancellationToken) -> Result<()> {
        if self.delay.is_zero() {
            return if cancel.is_cancelled() {
                Err(Error::Cancelled)
            } else {
                Ok(())
            };
        }
        self.sleeper.sleep(self.delay, cancel).await
    }

    /// Sleeps out the remainder of a full budget window.
    pub async fn budget_wait(&self, wait: Duration, cancel: &CancellationToken) -> Result<()> {
        tracing::info!(
            wait_secs = wait.as_secs_f64(),
            "Token budget exhausted, waiting for the next window"
        );
        self.sleeper.sleep(wait, cancel).await
    }
}
