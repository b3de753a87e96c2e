//! Long-polling update source.
//!
//! Repeatedly calls `getUpdates` with the next offset, emitting each batch
//! downstream in order. The offset only moves past a batch once it has been
//! handed off, so no update is ever lost or delivered twice. Transport
//! failures retry with jittered exponential backoff; an API-level failure is
//! fatal and ends the stream (which shuts the bot down cleanly).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use rand::Rng;
use tracing::{error, warn};

use scenbot_core::types::Update;
use scenbot_core::{BotError, Result, UpdateSource};

use crate::client::TelegramClient;
use crate::config::BotConfig;
use crate::method::GetUpdates;

/// The one capability long polling needs. Production code uses
/// [`TelegramClient`]; tests drive the poller with a scripted implementation.
#[async_trait]
pub trait UpdatesApi: Send + Sync {
    async fn get_updates(&self, offset: i64, timeout_secs: i64, limit: i64)
        -> Result<Vec<Update>>;
}

#[async_trait]
impl UpdatesApi for TelegramClient {
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: i64,
        limit: i64,
    ) -> Result<Vec<Update>> {
        self.execute(
            GetUpdates::new()
                .offset(offset)
                .timeout(timeout_secs)
                .limit(limit),
        )
        .await
    }
}

/// Long-polling [`UpdateSource`] over an [`UpdatesApi`].
pub struct LongPolling<A = TelegramClient> {
    api: Arc<A>,
    timeout_secs: i64,
    limit: i64,
    backoff_base: Duration,
    backoff_cap: Duration,
}

struct PollState<A> {
    api: Arc<A>,
    offset: i64,
    failures: u32,
    timeout_secs: i64,
    limit: i64,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl<A: UpdatesApi + 'static> LongPolling<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            timeout_secs: 30,
            limit: 100,
            backoff_base: Duration::from_millis(1000),
            backoff_cap: Duration::from_millis(30_000),
        }
    }

    pub fn from_config(api: Arc<A>, config: &BotConfig) -> Self {
        Self {
            api,
            timeout_secs: config.polling_timeout_secs,
            limit: config.polling_limit,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_cap: Duration::from_millis(config.backoff_cap_ms),
        }
    }

    pub fn timeout_secs(mut self, timeout_secs: i64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// The infinite update stream. Dropping it cancels the in-flight
    /// `getUpdates` call; a batch is never partially emitted because the
    /// offset only advances together with handing the whole batch off.
    pub fn stream(&self) -> impl Stream<Item = Update> + Send + 'static {
        let state = PollState {
            api: self.api.clone(),
            offset: 0,
            failures: 0,
            timeout_secs: self.timeout_secs,
            limit: self.limit,
            backoff_base: self.backoff_base,
            backoff_cap: self.backoff_cap,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                match state
                    .api
                    .get_updates(state.offset, state.timeout_secs, state.limit)
                    .await
                {
                    Ok(batch) => {
                        state.failures = 0;
                        if let Some(last) = batch.last() {
                            state.offset = last.update_id() + 1;
                            return Some((stream::iter(batch), state));
                        }
                        // Empty batch: poll again with the same offset.
                    }
                    Err(BotError::Transport(reason)) => {
                        let delay =
                            backoff_delay(state.backoff_base, state.backoff_cap, state.failures);
                        warn!(
                            error = %reason,
                            delay_ms = delay.as_millis() as u64,
                            "getUpdates transport failure, backing off"
                        );
                        state.failures = state.failures.saturating_add(1);
                        tokio::time::sleep(delay).await;
                    }
                    Err(fatal) => {
                        error!(error = %fatal, "getUpdates failed, stopping the update stream");
                        return None;
                    }
                }
            }
        })
        .flatten()
    }
}

impl<A: UpdatesApi + 'static> UpdateSource for LongPolling<A> {
    fn updates(&mut self) -> BoxStream<'_, Update> {
        self.stream().boxed()
    }
}

/// Exponential backoff with equal jitter: half the capped delay is fixed,
/// the other half uniformly random.
fn backoff_delay(base: Duration, cap: Duration, failures: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(failures.min(16)));
    let capped = exp.min(cap);
    let half = capped.as_millis() as u64 / 2;
    Duration::from_millis(half + rand::thread_rng().gen_range(0..=half.max(1)))
}
