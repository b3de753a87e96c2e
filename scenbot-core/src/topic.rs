//! Broadcast topic for fanning one update stream out to many consumers.
//!
//! Each subscriber owns a bounded queue of capacity 1; publishing waits for
//! room on every live subscriber, so delivery is in publish order and
//! lossless for any subscriber that keeps consuming. Late subscribers start
//! at the current tail; there is no replay. Subscribers that went away are
//! pruned on the next publish.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::types::Update;

const SUBSCRIBER_BUFFER: usize = 1;

/// Multi-subscriber broadcast channel of updates.
#[derive(Clone, Default)]
pub struct Topic {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<Update>>>>,
}

/// One subscriber's end of a [`Topic`].
pub struct Subscription {
    rx: mpsc::Receiver<Update>,
}

impl Subscription {
    /// Receives the next published update, or `None` once the topic is
    /// closed and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Update> {
        self.rx.recv().await
    }
}

impl Topic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber starting at the current tail.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers
            .lock()
            .expect("topic subscriber list poisoned")
            .push(tx);
        Subscription { rx }
    }

    /// Delivers `update` to every current subscriber, in subscription order,
    /// waiting for buffer room on each. Subscribers whose receiving end is
    /// gone are dropped from the list.
    pub async fn publish(&self, update: Update) {
        let senders: Vec<mpsc::Sender<Update>> = self
            .subscribers
            .lock()
            .expect("topic subscriber list poisoned")
            .clone();

        let mut any_gone = false;
        for sender in &senders {
            if sender.send(update.clone()).await.is_err() {
                any_gone = true;
            }
        }

        if any_gone {
            self.subscribers
                .lock()
                .expect("topic subscriber list poisoned")
                .retain(|sender| !sender.is_closed());
        }
    }

    /// Closes the topic: existing subscribers drain their buffers and then
    /// see the end of the stream.
    pub fn close(&self) {
        self.subscribers
            .lock()
            .expect("topic subscriber list poisoned")
            .clear();
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("topic subscriber list poisoned")
            .len()
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
