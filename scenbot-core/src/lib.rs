//! # scenbot-core
//!
//! Scenario engine for conversational bots: a composable description of
//! multi-step, per-chat interactions ([`Scenario`]), and a runtime
//! ([`Dispatcher`]) that fans one stream of updates out to many concurrent
//! scenario instances with per-chat isolation. Transport-agnostic; the
//! Telegram binding lives in `scenbot-telegram`.
//!
//! ```no_run
//! use scenbot_core::{expect, BotError, Dispatcher, Scenario};
//!
//! # async fn example(source: impl futures::Stream<Item = scenbot_core::Update> + Send) {
//! let greet = Scenario::start(expect::command("hi")).and_then(|_msg| {
//!     // send a reply through the RPC client of your transport crate
//!     Scenario::eval(|| async { Ok::<(), BotError>(()) })
//! });
//!
//! Dispatcher::new().add_scenario(greet).run(source).await;
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod expect;
pub mod logger;
pub mod pipes;
pub mod scenario;
pub mod source;
pub mod topic;
pub mod types;

pub use dispatch::{BotUpdates, Dispatcher};
pub use error::{BotError, Result};
pub use expect::Expect;
pub use logger::init_tracing;
pub use scenario::{Outcome, Scenario};
pub use source::UpdateSource;
pub use topic::{Subscription, Topic};
pub use types::{CallbackQuery, Chat, Message, Update, User};
