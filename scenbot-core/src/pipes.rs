//! Pure projections from [`Update`] to its payload variants. Each function
//! is total over updates and partial over kinds: it yields `Some` only for
//! its own variant. The dispatcher uses [`message`] to find triggering
//! events; user code builds [`Expect`](crate::expect::Expect)s on top.

use crate::types::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, Poll, PreCheckoutQuery,
    ShippingQuery, Update,
};

pub fn message(update: &Update) -> Option<&Message> {
    match update {
        Update::Message { message, .. } => Some(message),
        _ => None,
    }
}

pub fn edited_message(update: &Update) -> Option<&Message> {
    match update {
        Update::EditedMessage { message, .. } => Some(message),
        _ => None,
    }
}

pub fn channel_post(update: &Update) -> Option<&Message> {
    match update {
        Update::ChannelPost { message, .. } => Some(message),
        _ => None,
    }
}

pub fn edited_channel_post(update: &Update) -> Option<&Message> {
    match update {
        Update::EditedChannelPost { message, .. } => Some(message),
        _ => None,
    }
}

pub fn callback_query(update: &Update) -> Option<&CallbackQuery> {
    match update {
        Update::CallbackQuery { query, .. } => Some(query),
        _ => None,
    }
}

pub fn inline_query(update: &Update) -> Option<&InlineQuery> {
    match update {
        Update::InlineQuery { query, .. } => Some(query),
        _ => None,
    }
}

pub fn chosen_inline_result(update: &Update) -> Option<&ChosenInlineResult> {
    match update {
        Update::ChosenInlineResult { result, .. } => Some(result),
        _ => None,
    }
}

pub fn poll_update(update: &Update) -> Option<&Poll> {
    match update {
        Update::PollUpdate { poll, .. } => Some(poll),
        _ => None,
    }
}

pub fn shipping_query(update: &Update) -> Option<&ShippingQuery> {
    match update {
        Update::ShippingQuery { query, .. } => Some(query),
        _ => None,
    }
}

pub fn pre_checkout_query(update: &Update) -> Option<&PreCheckoutQuery> {
    match update {
        Update::PreCheckoutQuery { query, .. } => Some(query),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chat;

    fn text_update(chat_id: i64, text: &str) -> Update {
        Update::Message {
            update_id: 1,
            message: Message {
                message_id: 1,
                from: None,
                chat: Chat { id: chat_id },
                date: 0,
                text: Some(text.to_string()),
            },
        }
    }

    #[test]
    fn test_message_projects_only_messages() {
        let update = text_update(7, "hello");
        assert_eq!(message(&update).map(|m| m.chat.id), Some(7));
        assert!(callback_query(&update).is_none());
        assert!(edited_message(&update).is_none());
    }

    #[test]
    fn test_unsupported_matches_nothing() {
        let update = Update::Unsupported { update_id: 9 };
        assert!(message(&update).is_none());
        assert!(inline_query(&update).is_none());
        assert!(poll_update(&update).is_none());
    }
}
