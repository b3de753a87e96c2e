//! Fan-out runtime: drives every registered scenario against one shared
//! update stream.
//!
//! One publisher feeds a broadcast [`Topic`]; each scenario gets a trigger
//! loop with its own subscription and a chat registry. The first message in
//! a chat with no live instance spawns one; while an instance is live, all
//! message updates for its chat are routed into its unbounded queue, so a
//! slow scenario backpressures nobody but itself. Instance failures are
//! logged and contained; they never touch sibling instances or the
//! publisher.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::{future, stream, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info};

use crate::pipes;
use crate::scenario::{Outcome, Scenario};
use crate::source::UpdateSource;
use crate::topic::{Subscription, Topic};
use crate::types::Update;

/// Chat ids with a live instance for one scenario, each holding the queue
/// feeding that instance. Insert-if-absent happens under a single lock
/// acquisition; the lock is never held across a suspension point.
type Registry = Arc<Mutex<HashMap<i64, mpsc::UnboundedSender<Update>>>>;

/// Runs a set of scenarios concurrently against a shared update stream,
/// keeping at most one live instance per (scenario, chat).
#[derive(Default)]
pub struct Dispatcher {
    scenarios: Vec<Scenario<()>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scenario. Each registered scenario gets its own chat
    /// registry and observes every incoming message independently.
    pub fn add_scenario(mut self, scenario: Scenario<()>) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Drives all scenarios until `source` ends, then lets running
    /// instances wind down. Dropping the returned future cancels the
    /// publisher and every instance task.
    pub async fn run<S>(self, source: S)
    where
        S: Stream<Item = Update> + Send,
    {
        let topic = Topic::new();
        let mut guard = LoopGuard::new(spawn_scenario_loops(self.scenarios, &topic));

        futures::pin_mut!(source);
        while let Some(update) = source.next().await {
            topic.publish(update).await;
        }
        topic.close();
        guard.finish().await;
    }

    /// Convenience for driving an [`UpdateSource`] directly.
    pub async fn run_source<U: UpdateSource>(self, source: &mut U) {
        self.run(source.updates()).await;
    }

    /// Like [`run`](Dispatcher::run), but hands the updates back as a
    /// stream in source order, so callers can observe or further process
    /// them. Scenarios only make progress while the stream is being polled;
    /// dropping it cancels all of them.
    pub fn updates<S>(self, source: S) -> BotUpdates
    where
        S: Stream<Item = Update> + Send + 'static,
    {
        let topic = Topic::new();
        let guard = LoopGuard::new(spawn_scenario_loops(self.scenarios, &topic));

        let publish_topic = topic.clone();
        let published = source.then(move |update| {
            let topic = publish_topic.clone();
            async move {
                topic.publish(update.clone()).await;
                update
            }
        });
        let tail = stream::once(async move { topic.close() })
            .filter_map(|()| future::ready(None::<Update>));

        BotUpdates {
            inner: published.chain(tail).boxed(),
            _guard: guard,
        }
    }
}

/// Update stream returned by [`Dispatcher::updates`]: re-emits the source
/// sequence unchanged while feeding the scenario loops. Dropping it aborts
/// them.
pub struct BotUpdates {
    inner: BoxStream<'static, Update>,
    _guard: LoopGuard,
}

impl Stream for BotUpdates {
    type Item = Update;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Update>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Aborts the scenario loops unless they were awaited to completion.
struct LoopGuard {
    handles: Vec<JoinHandle<()>>,
}

impl LoopGuard {
    fn new(handles: Vec<JoinHandle<()>>) -> Self {
        Self { handles }
    }

    async fn finish(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

fn spawn_scenario_loops(scenarios: Vec<Scenario<()>>, topic: &Topic) -> Vec<JoinHandle<()>> {
    info!(scenario_count = scenarios.len(), "starting scenario loops");
    scenarios
        .into_iter()
        .enumerate()
        .map(|(index, scenario)| {
            let subscription = topic.subscribe();
            tokio::spawn(scenario_loop(index, scenario, subscription))
        })
        .collect()
}

/// Watches the topic for message updates and routes each to the live
/// instance of this scenario for its chat, spawning a new instance when the
/// chat has none.
async fn scenario_loop(index: usize, scenario: Scenario<()>, mut subscription: Subscription) {
    let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
    let mut instances = JoinSet::new();

    while let Some(update) = subscription.recv().await {
        let chat_id = match pipes::message(&update) {
            Some(message) => message.chat.id,
            None => continue,
        };

        let mut live = registry.lock().expect("chat registry poisoned");
        if let Some(queue) = live.get(&chat_id) {
            if queue.send(update.clone()).is_ok() {
                continue;
            }
            // The instance ended but has not deregistered yet; the chat is
            // free again.
            live.remove(&chat_id);
        }
        let (queue, inputs) = mpsc::unbounded_channel();
        live.insert(chat_id, queue);
        drop(live);

        debug!(scenario = index, chat_id, "starting scenario instance");
        instances.spawn(run_instance(
            index,
            scenario.clone(),
            update,
            chat_id,
            inputs,
            registry.clone(),
        ));
    }

    // Source ended: close every instance queue and let the instances finish.
    registry.lock().expect("chat registry poisoned").clear();
    while instances.join_next().await.is_some() {}
}

/// One execution of a scenario bound to a chat: the triggering update is the
/// first input, followed by everything routed into the instance queue.
async fn run_instance(
    index: usize,
    scenario: Scenario<()>,
    trigger: Update,
    chat_id: i64,
    inputs: mpsc::UnboundedReceiver<Update>,
    registry: Registry,
) {
    let updates = stream::once(future::ready(trigger)).chain(UnboundedReceiverStream::new(inputs));
    let outcome = scenario.run(updates).await;

    match outcome {
        Outcome::Completed(()) => {
            debug!(scenario = index, chat_id, "scenario instance completed")
        }
        Outcome::FellThrough => {
            debug!(scenario = index, chat_id, "scenario instance fell through")
        }
        Outcome::Failed(err) => {
            error!(scenario = index, chat_id, error = %err, "scenario instance failed")
        }
    }

    // Deregister, unless a successor instance already took the slot (its
    // queue would still be open).
    let mut live = registry.lock().expect("chat registry poisoned");
    if live
        .get(&chat_id)
        .map(|queue| queue.is_closed())
        .unwrap_or(false)
    {
        live.remove(&chat_id);
    }
}
