//! Expectations: composable partial projections over incoming updates.
//!
//! An [`Expect`] decides whether an update is the one a scenario is waiting
//! for, and if so what value to hand to the continuation. Expectations are
//! pure, cloneable, and composed with [`when`](Expect::when) and
//! [`map`](Expect::map).

use std::sync::Arc;

use crate::pipes;
use crate::types::{CallbackQuery, Message, Update};

/// A partial projection `Update -> Option<T>`.
pub struct Expect<T> {
    check: Arc<dyn Fn(&Update) -> Option<T> + Send + Sync>,
}

impl<T> Clone for Expect<T> {
    fn clone(&self) -> Self {
        Self {
            check: self.check.clone(),
        }
    }
}

impl<T: Send + 'static> Expect<T> {
    /// Wraps an arbitrary projection.
    pub fn new(f: impl Fn(&Update) -> Option<T> + Send + Sync + 'static) -> Self {
        Self { check: Arc::new(f) }
    }

    /// Applies the projection to one update.
    pub fn check(&self, update: &Update) -> Option<T> {
        (self.check)(update)
    }

    /// Keeps only matches satisfying `predicate`.
    pub fn when(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        let inner = self.check;
        Self::new(move |update| inner(update).filter(|value| predicate(value)))
    }

    /// Transforms the matched value.
    pub fn map<U: Send + 'static>(
        self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Expect<U> {
        let inner = self.check;
        Expect::new(move |update| inner(update).map(&f))
    }
}

/// Any incoming message.
pub fn message() -> Expect<Message> {
    Expect::new(|update| pipes::message(update).cloned())
}

/// Text content of any incoming message, commands included.
pub fn text() -> Expect<String> {
    Expect::new(|update| {
        pipes::message(update).and_then(|m| m.text.clone())
    })
}

/// Text content of an incoming message that is not a bot command.
pub fn plain_text() -> Expect<String> {
    text().when(|t| !t.starts_with('/'))
}

/// A `/name` command message, with or without a `@botname` suffix.
pub fn command(name: &str) -> Expect<Message> {
    let name = name.to_string();
    message().when(move |m| {
        m.text()
            .and_then(|t| t.split_whitespace().next())
            .map(|head| {
                let head = head.strip_prefix('/').unwrap_or(head);
                match head.split_once('@') {
                    Some((cmd, _bot)) => cmd == name,
                    None => head == name,
                }
            })
            .unwrap_or(false)
    })
}

/// Any incoming message sent by the given user.
pub fn from_user(user_id: i64) -> Expect<Message> {
    message().when(move |m| m.from.as_ref().map(|u| u.id) == Some(user_id))
}

/// Any callback query.
pub fn callback_query() -> Expect<CallbackQuery> {
    Expect::new(|update| pipes::callback_query(update).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chat, User};

    fn text_update(chat_id: i64, from_id: i64, text: &str) -> Update {
        Update::Message {
            update_id: 1,
            message: Message {
                message_id: 1,
                from: Some(User {
                    id: from_id,
                    is_bot: false,
                    first_name: format!("user-{}", from_id),
                    last_name: None,
                    username: None,
                }),
                chat: Chat { id: chat_id },
                date: 0,
                text: Some(text.to_string()),
            },
        }
    }

    #[test]
    fn test_command_matches_with_and_without_bot_suffix() {
        let expect = command("hi");
        assert!(expect.check(&text_update(1, 1, "/hi")).is_some());
        assert!(expect.check(&text_update(1, 1, "/hi@my_bot")).is_some());
        assert!(expect.check(&text_update(1, 1, "/hi there")).is_some());
        assert!(expect.check(&text_update(1, 1, "/history")).is_none());
        assert!(expect.check(&text_update(1, 1, "hi")).is_none());
    }

    #[test]
    fn test_text_includes_commands_plain_text_excludes_them() {
        let any = text();
        let plain = plain_text();
        let cmd = text_update(1, 1, "/other");
        let word = text_update(1, 1, "Alice");

        assert_eq!(any.check(&cmd).as_deref(), Some("/other"));
        assert_eq!(any.check(&word).as_deref(), Some("Alice"));
        assert!(plain.check(&cmd).is_none());
        assert_eq!(plain.check(&word).as_deref(), Some("Alice"));
    }

    #[test]
    fn test_when_filters_and_map_transforms() {
        let expect = message()
            .when(|m| m.chat.id == 5)
            .map(|m| m.chat.id * 10);

        assert_eq!(expect.check(&text_update(5, 1, "x")), Some(50));
        assert_eq!(expect.check(&text_update(6, 1, "x")), None);
    }

    #[test]
    fn test_from_user_filters_by_sender() {
        let expect = from_user(42);
        assert!(expect.check(&text_update(1, 42, "x")).is_some());
        assert!(expect.check(&text_update(1, 43, "x")).is_none());
    }

    #[test]
    fn test_callback_query_ignores_messages() {
        let expect = callback_query();
        assert!(expect.check(&text_update(1, 1, "x")).is_none());
    }
}
