//! Bot facade: wires config, client, update source, and dispatcher into one
//! entry point, the way an application binary uses the library.
//!
//! ## Error handling
//!
//! Scenario failures are contained by the dispatcher and only logged; errors
//! reaching this layer are startup problems (bad config, webhook
//! registration) and stop the bot.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, instrument};

use scenbot_core::{init_tracing, Dispatcher};

use crate::client::TelegramClient;
use crate::config::BotConfig;
use crate::method::{DeleteWebhook, GetMe, SetWebhook};
use crate::polling::LongPolling;
use crate::webhook::WebhookServer;

pub struct Bot {
    config: BotConfig,
    client: Arc<TelegramClient>,
}

impl Bot {
    pub fn new(config: BotConfig) -> Result<Self> {
        config.validate()?;
        let client = match &config.api_url {
            Some(url) => TelegramClient::with_base_url(&config.token, url),
            None => TelegramClient::new(&config.token),
        };
        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(BotConfig::from_env()?)
    }

    /// The shared RPC client, for scenario effects to capture.
    pub fn client(&self) -> Arc<TelegramClient> {
        self.client.clone()
    }

    /// A long-polling source tuned by this bot's config.
    pub fn polling(&self) -> LongPolling<TelegramClient> {
        LongPolling::from_config(self.client.clone(), &self.config)
    }

    /// Long-polling entry point: initializes tracing, probes the bot
    /// identity, then drives the dispatcher until the update stream ends.
    #[instrument(skip(self, dispatcher))]
    pub async fn run(self, dispatcher: Dispatcher) -> Result<()> {
        init_tracing(self.config.log_file.as_deref())?;
        self.probe_identity().await;
        info!("bot started (long polling)");
        dispatcher.run(self.polling().stream()).await;
        info!("update stream ended, bot stopped");
        Ok(())
    }

    /// Webhook entry point: registers `webhook_url` with the API, binds
    /// `addr`, and drives the dispatcher from posted updates. The webhook
    /// registration is removed on the way out.
    #[instrument(skip(self, dispatcher))]
    pub async fn run_webhook(self, dispatcher: Dispatcher, addr: SocketAddr) -> Result<()> {
        init_tracing(self.config.log_file.as_deref())?;
        let url = self
            .config
            .webhook_url
            .clone()
            .context("webhook_url is required for webhook mode")?;

        self.client.execute(SetWebhook { url }).await?;
        let mut server = WebhookServer::bind(addr).await?;
        self.probe_identity().await;
        info!(addr = %server.local_addr(), "bot started (webhook)");

        dispatcher.run_source(&mut server).await;

        if let Err(err) = self.client.execute(DeleteWebhook {}).await {
            error!(error = %err, "failed to remove webhook registration");
        }
        Ok(())
    }

    async fn probe_identity(&self) {
        match self.client.execute(GetMe {}).await {
            Ok(me) => info!(
                bot_id = me.id,
                username = %me.username.as_deref().unwrap_or("unknown"),
                "bot identified"
            ),
            Err(err) => error!(error = %err, "getMe failed"),
        }
    }
}
