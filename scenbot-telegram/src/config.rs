//! Framework configuration: token, API address, polling and backoff tuning.
//! Loaded from environment variables, with validated ranges.

use std::env;

use anyhow::Result;

/// Bot configuration.
///
/// Environment variables read by [`from_env`](BotConfig::from_env):
/// `BOT_TOKEN` (required), `TELEGRAM_API_URL`, `POLLING_TIMEOUT_SECS`,
/// `POLLING_LIMIT`, `BACKOFF_BASE_MS`, `BACKOFF_CAP_MS`, `WEBHOOK_URL`,
/// `LOG_FILE`.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub api_url: Option<String>,
    pub polling_timeout_secs: i64,
    pub polling_limit: i64,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub webhook_url: Option<String>,
    pub log_file: Option<String>,
}

impl BotConfig {
    /// Defaults with the given token: 30 s polling timeout, batches of 100,
    /// backoff from 1 s up to 30 s.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: None,
            polling_timeout_secs: 30,
            polling_limit: 100,
            backoff_base_ms: 1000,
            backoff_cap_ms: 30_000,
            webhook_url: None,
            log_file: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let token = env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?;
        let mut config = Self::with_token(token);

        config.api_url = env::var("TELEGRAM_API_URL").ok();
        config.webhook_url = env::var("WEBHOOK_URL").ok();
        config.log_file = env::var("LOG_FILE").ok();

        if let Some(value) = parse_env("POLLING_TIMEOUT_SECS")? {
            config.polling_timeout_secs = value;
        }
        if let Some(value) = parse_env("POLLING_LIMIT")? {
            config.polling_limit = value;
        }
        if let Some(value) = parse_env("BACKOFF_BASE_MS")? {
            config.backoff_base_ms = value;
        }
        if let Some(value) = parse_env("BACKOFF_CAP_MS")? {
            config.backoff_cap_ms = value;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            anyhow::bail!("bot token must not be empty");
        }
        if !(1..=60).contains(&self.polling_timeout_secs) {
            anyhow::bail!(
                "polling_timeout_secs must be in [1, 60], got {}",
                self.polling_timeout_secs
            );
        }
        if !(1..=100).contains(&self.polling_limit) {
            anyhow::bail!(
                "polling_limit must be in [1, 100], got {}",
                self.polling_limit
            );
        }
        if self.backoff_base_ms == 0 {
            anyhow::bail!("backoff_base_ms must be positive");
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            anyhow::bail!(
                "backoff_cap_ms ({}) must not be below backoff_base_ms ({})",
                self.backoff_cap_ms,
                self.backoff_base_ms
            );
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has invalid value: {}", name, raw)),
        Err(_) => Ok(None),
    }
}
