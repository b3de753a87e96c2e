//! # scenbot-telegram
//!
//! Telegram Bot API binding for the `scenbot-core` scenario engine: typed
//! [`Method`] values executed by [`TelegramClient`], a long-polling update
//! source, and a webhook receiver. Scenario effects capture the client and
//! call [`TelegramClient::execute`] with the method they need.
//!
//! ```no_run
//! use std::sync::Arc;
//! use scenbot_core::{expect, Dispatcher, Scenario};
//! use scenbot_telegram::{Bot, BotConfig, SendMessage};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let bot = Bot::new(BotConfig::with_token("123:abc"))?;
//! let client = bot.client();
//!
//! let greet = Scenario::start(expect::command("hi")).and_then(move |msg| {
//!     let client = client.clone();
//!     let chat_id = msg.chat.id;
//!     Scenario::eval(move || {
//!         let client = client.clone();
//!         async move {
//!             client.execute(SendMessage::new(chat_id, "Hello!")).await?;
//!             Ok(())
//!         }
//!     })
//! });
//!
//! bot.run(Dispatcher::new().add_scenario(greet)).await
//! # }
//! ```

pub mod bot;
pub mod client;
pub mod config;
pub mod method;
pub mod polling;
pub mod webhook;

pub use bot::Bot;
pub use client::{mask_token, ApiResponse, TelegramClient, DEFAULT_BASE_URL};
pub use config::BotConfig;
pub use method::{
    AnswerCallbackQuery, ByteSource, DeleteMessage, DeleteWebhook, EditMessageReplyMarkup,
    EditMessageText, FilePart, ForwardMessage, GetMe, GetUpdates, InlineKeyboardButton,
    InlineKeyboardMarkup, InputFile, Method, SendChatAction, SendDocument, SendMessage,
    SendPhoto, SetWebhook,
};
pub use polling::{LongPolling, UpdatesApi};
pub use webhook::WebhookServer;
