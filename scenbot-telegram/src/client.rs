//! HTTP client for the Bot API: executes a [`Method`] and returns its typed
//! response.
//!
//! ## Error handling
//!
//! Network failures surface as [`BotError::Transport`], unparseable bodies
//! as [`BotError::Decode`], and `ok=false` envelopes as [`BotError::Api`]
//! with the method name and the API's diagnostics. The client never
//! retries; retry policy belongs to callers (long polling retries transport
//! failures, method calls do not).

use reqwest::multipart;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use scenbot_core::{BotError, Result};

use crate::method::Method;

pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Shareable Bot API client. Cloning is cheap; the underlying connection
/// pool is reused.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, name: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, name)
    }

    /// Executes `method` and decodes its response envelope.
    ///
    /// Requests without uploads go out as a JSON body. Requests with uploads
    /// go out as multipart: file parts are streamed from their byte sources,
    /// and the remaining scalar fields of the JSON encoding become form
    /// fields (nulls and sub-objects are omitted).
    pub async fn execute<M: Method>(&self, mut method: M) -> Result<M::Response> {
        let uploads = method.take_uploads();
        let url = self.method_url(M::NAME);
        debug!(method = M::NAME, uploads = uploads.len(), "executing method");

        let request = if uploads.is_empty() {
            self.http.post(&url).json(&method)
        } else {
            let encoded = serde_json::to_value(&method)
                .map_err(|e| BotError::Decode(format!("{}: request encoding: {}", M::NAME, e)))?;

            let mut form = multipart::Form::new();
            if let Value::Object(fields) = encoded {
                for (name, value) in fields {
                    let text = match value {
                        Value::Null | Value::Object(_) | Value::Array(_) => continue,
                        Value::String(text) => text,
                        other => other.to_string(),
                    };
                    form = form.text(name, text);
                }
            }
            for part in uploads {
                let body = reqwest::Body::wrap_stream(part.source.into_stream());
                form = form.part(part.field, multipart::Part::stream(body).file_name(part.file_name));
            }
            self.http.post(&url).multipart(form)
        };

        let response = request
            .send()
            .await
            .map_err(|e| BotError::Transport(self.redact(e.to_string())))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BotError::Transport(self.redact(e.to_string())))?;

        let envelope: ApiResponse<M::Response> = serde_json::from_slice(&body)
            .map_err(|e| BotError::Decode(format!("{}: {}", M::NAME, e)))?;
        envelope.into_result(M::NAME)
    }

    /// Replaces the raw token with its masked form, so transport errors that
    /// quote the request URL stay safe to log.
    fn redact(&self, text: String) -> String {
        if self.token.is_empty() {
            return text;
        }
        text.replace(&self.token, &mask_token(&self.token))
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .field("token", &mask_token(&self.token))
            .finish()
    }
}

/// Masks a token for logging: first 7 and last 4 characters stay visible;
/// anything of length 11 or less is fully masked.
pub fn mask_token(token: &str) -> String {
    if token.len() <= 11 {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[token.len() - 4..])
}

/// Response envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    /// Success iff `ok` and `result` is present; everything else is a typed
    /// failure carrying the method name.
    pub fn into_result(self, method: &str) -> Result<T> {
        if self.ok {
            self.result
                .ok_or_else(|| BotError::Decode(format!("{}: ok response without result", method)))
        } else {
            Err(BotError::Api {
                method: method.to_string(),
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            })
        }
    }
}
