//! Deterministic collaborators for exercising dispatch without a network or
//! wall-clock waits.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::budget::ManualClock;
use crate::client::{CompletionClient, CompletionRequest};
use crate::dispatch::Sleeper;
use crate::{Error, Result};

#[derive(Debug)]
enum Step {
    Reply(String),
    Fail(Error),
    /// Never completes; only cancellation ends the call.
    Hang,
}

/// Completion client that plays back a fixed script and records every
/// request it receives.
///
/// Requests beyond the end of the script fail with [`Error::Api`].
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(text.into()))
    }

    pub fn replies<I, S>(self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts.into_iter().fold(self, |client, text| client.reply(text))
    }

    pub fn fail(self, error: Error) -> Self {
        self.push(Step::Fail(error))
    }

    pub fn hang(self) -> Self {
        self.push(Step::Hang)
    }

    fn push(self, step: Step) -> Self {
        lock(&self.script).push_back(step);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        lock(&self.requests).push(request);
        let step = lock(&self.script).pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(Error::Api {
                message: "script exhausted".into(),
                status: None,
                error_type: None,
            }),
        }
    }
}

/// Sleeper that returns immediately, advancing a [`ManualClock`] by the
/// requested duration and recording it.
#[derive(Debug)]
pub struct RecordingSleeper {
    clock: Arc<ManualClock>,
    sleeps: Mutex<Vec<Duration>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl RecordingSleeper {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            sleeps: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
        }
    }

    /// Cancels `token` once `sleeps` sleeps have been recorded.
    pub fn cancel_after(&self, sleeps: usize, token: CancellationToken) {
        *lock(&self.cancel_after) = Some((sleeps, token));
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }

    pub fn total(&self) -> Duration {
        lock(&self.sleeps).iter().sum()
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let recorded = {
            let mut sleeps = lock(&self.sleeps);
            sleeps.push(duration);
            sleeps.len()
        };
        self.clock.advance(duration);

        let trigger = lock(&self.cancel_after)
            .as_ref()
            .filter(|(after, _)| recorded >= *after)
            .map(|(_, token)| token.clone());
        if let Some(token) = trigger {
            token.cancel();
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatMessage, DecodingParams};

    fn request() -> CompletionRequest {
        CompletionRequest::new("m", vec![ChatMessage::user("hi")], DecodingParams::default())
    }

    #[tokio::test]
    async fn test_scripted_client_plays_in_order() {
        let client = ScriptedClient::new()
            .replies(["one", "two"])
            .fail(Error::MalformedResponse("bad".into()));

        assert_eq!(client.complete(request()).await.unwrap(), "one");
        assert_eq!(client.complete(request()).await.unwrap(), "two");
        assert!(matches!(
            client.complete(request()).await,
            Err(Error::MalformedResponse(_))
        ));
        assert!(client.complete(request()).await.is_err());
        assert_eq!(client.request_count(), 4);
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn test_recording_sleeper_advances_clock() {
        let clock = Arc::new(ManualClock::new());
        let sleeper = RecordingSleeper::new(clock.clone());
        let cancel = CancellationToken::new();

        sleeper.sleep(Duration::from_secs(2), &cancel).await.unwrap();
        sleeper.sleep(Duration::from_secs(50), &cancel).await.unwrap();
        assert_eq!(clock.elapsed(), Duration::from_secs(52));
        assert_eq!(sleeper.total(), Duration::from_secs(52));
    }

    #[tokio::test]
    async fn test_recording_sleeper_cancel_after() {
        let sleeper = RecordingSleeper::new(Arc::new(ManualClock::new()));
        let cancel = CancellationToken::new();
        sleeper.cancel_after(2, cancel.clone());

        assert!(sleeper.sleep(Duration::from_secs(1), &cancel).await.is_ok());
        assert!(matches!(
            sleeper.sleep(Duration::from_secs(1), &cancel).await,
            Err(Error::Cancelled)
        ));
        assert!(matches!(
            sleeper.sleep(Duration::from_secs(1), &cancel).await,
            Err(Error::Cancelled)
        ));
        assert_eq!(sleeper.sleeps().len(), 2);
    }
}
