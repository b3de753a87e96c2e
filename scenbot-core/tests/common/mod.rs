//! Shared builders for dispatcher tests: canned updates, a recording
//! outbox, and the greeting scenario used across the test suite.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{stream, Stream, StreamExt};
use scenbot_core::{expect, Chat, Expect, Message, Scenario, Update, User};

/// Records every outbound message as `(chat_id, text)`.
pub type Outbox = Arc<Mutex<Vec<(i64, String)>>>;

pub fn outbox() -> Outbox {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn sent(outbox: &Outbox) -> Vec<(i64, String)> {
    outbox.lock().unwrap().clone()
}

pub fn sent_to(outbox: &Outbox, chat_id: i64) -> Vec<String> {
    outbox
        .lock()
        .unwrap()
        .iter()
        .filter(|(chat, _)| *chat == chat_id)
        .map(|(_, text)| text.clone())
        .collect()
}

/// A scenario step that "sends" a message by recording it.
pub fn send(outbox: &Outbox, chat_id: i64, text: String) -> Scenario<()> {
    let outbox = outbox.clone();
    Scenario::eval(move || {
        let outbox = outbox.clone();
        let text = text.clone();
        async move {
            outbox.lock().unwrap().push((chat_id, text));
            Ok(())
        }
    })
}

pub fn user(id: i64, first_name: &str) -> User {
    User {
        id,
        is_bot: false,
        first_name: first_name.to_string(),
        last_name: None,
        username: None,
    }
}

pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
    text_update_from(update_id, chat_id, user(chat_id, "someone"), text)
}

pub fn text_update_from(update_id: i64, chat_id: i64, from: User, text: &str) -> Update {
    Update::Message {
        update_id,
        message: Message {
            message_id: update_id,
            from: Some(from),
            chat: Chat { id: chat_id },
            date: 0,
            text: Some(text.to_string()),
        },
    }
}

/// The greeting conversation from the crate documentation: `/hi`, ask for a
/// name, greet by whatever `name_expect` matches next.
pub fn greeting_with(outbox: &Outbox, name_expect: Expect<String>) -> Scenario<()> {
    let outbox = outbox.clone();
    Scenario::start(expect::command("hi")).and_then(move |msg| {
        let outbox = outbox.clone();
        let name_expect = name_expect.clone();
        let chat_id = msg.chat.id;
        send(&outbox, chat_id, "Hello. What's your name?".to_string()).and_then(move |_| {
            let outbox = outbox.clone();
            Scenario::next(name_expect.clone()).and_then(move |name| {
                send(&outbox, chat_id, format!("Nice to meet you, {}", name))
            })
        })
    })
}

pub fn greeting(outbox: &Outbox) -> Scenario<()> {
    greeting_with(outbox, expect::text())
}

/// Emits the batches in order with a small pause before each one, so that
/// everything in-flight settles between batches (tests run with a paused
/// clock, which only advances when all tasks are idle).
pub fn staged(batches: Vec<Vec<Update>>) -> impl Stream<Item = Update> + Send {
    stream::iter(batches)
        .then(|batch| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            stream::iter(batch)
        })
        .flatten()
}
