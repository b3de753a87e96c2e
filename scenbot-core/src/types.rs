//! Core wire types: updates, messages, users, chats, and the query payloads
//! the engine can be triggered by. Only a handful of discriminators are ever
//! read by the engine itself (`chat.id`, `from.id`, `text`); everything else
//! is opaque payload carried for user code.

use serde::{Deserialize, Serialize};

/// User identity as delivered by the messaging API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Chat identity. The engine keys all fan-out on `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A single incoming message. Non-text content arrives with `text: None`;
/// the engine never interprets content except through user-supplied
/// expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Message {
    /// Text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Callback query produced by an inline keyboard button press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Inline query (typed in the message field after the bot's username).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    pub query: String,
    #[serde(default)]
    pub offset: String,
}

/// Result of an inline query the user picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: User,
    pub query: String,
}

/// Poll state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub is_closed: bool,
}

/// Shipping query for payment flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuery {
    pub id: String,
    pub from: User,
    pub invoice_payload: String,
}

/// Pre-checkout confirmation query for payment flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub from: User,
    pub currency: String,
    pub total_amount: i64,
    pub invoice_payload: String,
}

/// One externally delivered event. The wire form is an object with
/// `update_id` plus exactly one payload field naming the kind; kinds this
/// library does not model decode to [`Update::Unsupported`] and are ignored
/// by every projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawUpdate", into = "RawUpdate")]
pub enum Update {
    Message { update_id: i64, message: Message },
    EditedMessage { update_id: i64, message: Message },
    ChannelPost { update_id: i64, message: Message },
    EditedChannelPost { update_id: i64, message: Message },
    CallbackQuery { update_id: i64, query: CallbackQuery },
    InlineQuery { update_id: i64, query: InlineQuery },
    ChosenInlineResult { update_id: i64, result: ChosenInlineResult },
    PollUpdate { update_id: i64, poll: Poll },
    ShippingQuery { update_id: i64, query: ShippingQuery },
    PreCheckoutQuery { update_id: i64, query: PreCheckoutQuery },
    Unsupported { update_id: i64 },
}

impl Update {
    /// Monotonically non-decreasing identifier assigned by the API.
    pub fn update_id(&self) -> i64 {
        match self {
            Update::Message { update_id, .. }
            | Update::EditedMessage { update_id, .. }
            | Update::ChannelPost { update_id, .. }
            | Update::EditedChannelPost { update_id, .. }
            | Update::CallbackQuery { update_id, .. }
            | Update::InlineQuery { update_id, .. }
            | Update::ChosenInlineResult { update_id, .. }
            | Update::PollUpdate { update_id, .. }
            | Update::ShippingQuery { update_id, .. }
            | Update::PreCheckoutQuery { update_id, .. }
            | Update::Unsupported { update_id } => *update_id,
        }
    }
}

/// Wire mirror of [`Update`]: `update_id` plus at most one payload field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    edited_message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    edited_channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    callback_query: Option<CallbackQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_query: Option<InlineQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chosen_inline_result: Option<ChosenInlineResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poll: Option<Poll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shipping_query: Option<ShippingQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pre_checkout_query: Option<PreCheckoutQuery>,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        let update_id = raw.update_id;
        if let Some(message) = raw.message {
            Update::Message { update_id, message }
        } else if let Some(message) = raw.edited_message {
            Update::EditedMessage { update_id, message }
        } else if let Some(message) = raw.channel_post {
            Update::ChannelPost { update_id, message }
        } else if let Some(message) = raw.edited_channel_post {
            Update::EditedChannelPost { update_id, message }
        } else if let Some(query) = raw.callback_query {
            Update::CallbackQuery { update_id, query }
        } else if let Some(query) = raw.inline_query {
            Update::InlineQuery { update_id, query }
        } else if let Some(result) = raw.chosen_inline_result {
            Update::ChosenInlineResult { update_id, result }
        } else if let Some(poll) = raw.poll {
            Update::PollUpdate { update_id, poll }
        } else if let Some(query) = raw.shipping_query {
            Update::ShippingQuery { update_id, query }
        } else if let Some(query) = raw.pre_checkout_query {
            Update::PreCheckoutQuery { update_id, query }
        } else {
            Update::Unsupported { update_id }
        }
    }
}

impl From<Update> for RawUpdate {
    fn from(update: Update) -> Self {
        let mut raw = RawUpdate {
            update_id: update.update_id(),
            ..RawUpdate::default()
        };
        match update {
            Update::Message { message, .. } => raw.message = Some(message),
            Update::EditedMessage { message, .. } => raw.edited_message = Some(message),
            Update::ChannelPost { message, .. } => raw.channel_post = Some(message),
            Update::EditedChannelPost { message, .. } => raw.edited_channel_post = Some(message),
            Update::CallbackQuery { query, .. } => raw.callback_query = Some(query),
            Update::InlineQuery { query, .. } => raw.inline_query = Some(query),
            Update::ChosenInlineResult { result, .. } => raw.chosen_inline_result = Some(result),
            Update::PollUpdate { poll, .. } => raw.poll = Some(poll),
            Update::ShippingQuery { query, .. } => raw.shipping_query = Some(query),
            Update::PreCheckoutQuery { query, .. } => raw.pre_checkout_query = Some(query),
            Update::Unsupported { .. } => {}
        }
        raw
    }
}
