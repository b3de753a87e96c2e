use thiserror::Error;

/// Error taxonomy for the engine and its transport bindings.
///
/// `Transport` is the only kind an update source retries; everything else is
/// surfaced to the caller. Errors raised inside a scenario instance are
/// contained by the dispatcher and never reach sibling instances.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Response decoding error: {0}")]
    Decode(String),

    #[error("Method {method} failed with code {code:?}: {description}")]
    Api {
        method: String,
        code: Option<i64>,
        description: String,
    },

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
