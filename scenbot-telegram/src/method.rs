//! Typed descriptions of Bot API methods.
//!
//! A [`Method`] bundles the endpoint name, the request encoding (its own
//! `Serialize` impl, snake_case fields, `None`s skipped), the response type,
//! and any file uploads. The catalog below covers what the scenario layer
//! and the update sources need; adding a method is one struct and one impl.

use std::io;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use tokio_util::io::ReaderStream;

use scenbot_core::types::{Message, Update, User};

/// A typed request against one Bot API endpoint.
pub trait Method: Serialize + Send {
    /// Endpoint suffix, e.g. `sendMessage`.
    const NAME: &'static str;
    /// Payload of a successful response envelope.
    type Response: DeserializeOwned;

    /// Extracts file uploads, leaving `attach://<field>` references behind.
    /// An empty result means the request goes out as plain JSON.
    fn take_uploads(&mut self) -> Vec<FilePart> {
        Vec::new()
    }
}

/// Streaming byte source for a file upload. Never materialised: the HTTP
/// client streams it as the multipart part body.
pub struct ByteSource {
    inner: Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync + 'static>>,
}

impl ByteSource {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            inner: Box::pin(stream::once(async move { Ok::<_, io::Error>(bytes) })),
        }
    }

    pub fn from_stream(
        stream: impl Stream<Item = io::Result<Bytes>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    pub fn from_file(file: tokio::fs::File) -> Self {
        Self {
            inner: Box::pin(ReaderStream::new(file)),
        }
    }

    pub(crate) fn into_stream(
        self,
    ) -> Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync + 'static>> {
        self.inner
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ByteSource")
    }
}

/// A file argument: either an id the API already knows, or a fresh upload.
#[derive(Debug)]
pub enum InputFile {
    Existing(String),
    Upload { file_name: String, source: ByteSource },
}

impl InputFile {
    pub fn existing(file_id: impl Into<String>) -> Self {
        InputFile::Existing(file_id.into())
    }

    pub fn upload(file_name: impl Into<String>, source: ByteSource) -> Self {
        InputFile::Upload {
            file_name: file_name.into(),
            source,
        }
    }

    /// Takes the upload out of this field (if it is one), replacing it with
    /// the `attach://<field>` reference the multipart body will satisfy.
    fn take_part(&mut self, field: &'static str) -> Option<FilePart> {
        if matches!(self, InputFile::Existing(_)) {
            return None;
        }
        let replaced = mem::replace(self, InputFile::Existing(format!("attach://{}", field)));
        match replaced {
            InputFile::Upload { file_name, source } => Some(FilePart {
                field,
                file_name,
                source,
            }),
            InputFile::Existing(_) => None,
        }
    }
}

impl Serialize for InputFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InputFile::Existing(id) => serializer.serialize_str(id),
            InputFile::Upload { file_name, .. } => serializer.serialize_str(file_name),
        }
    }
}

/// One multipart file part: form field name, file name, and streamed body.
#[derive(Debug)]
pub struct FilePart {
    pub field: &'static str,
    pub file_name: String,
    pub source: ByteSource,
}

/// Inline keyboard attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    pub fn new(rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        Self {
            inline_keyboard: rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetMe {}

impl Method for GetMe {
    const NAME: &'static str = "getMe";
    type Response = User;
}

#[derive(Debug, Clone, Serialize)]
pub struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
}

impl GetUpdates {
    pub fn new() -> Self {
        Self {
            offset: None,
            limit: None,
            timeout: None,
        }
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn timeout(mut self, timeout: i64) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for GetUpdates {
    fn default() -> Self {
        Self::new()
    }
}

impl Method for GetUpdates {
    const NAME: &'static str = "getUpdates";
    type Response = Vec<Update>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl SendMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            reply_to_message_id: None,
            reply_markup: None,
        }
    }

    pub fn parse_mode(mut self, mode: impl Into<String>) -> Self {
        self.parse_mode = Some(mode.into());
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn reply_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

impl Method for SendMessage {
    const NAME: &'static str = "sendMessage";
    type Response = Message;
}

#[derive(Debug, Clone, Serialize)]
pub struct ForwardMessage {
    pub chat_id: i64,
    pub from_chat_id: i64,
    pub message_id: i64,
}

impl Method for ForwardMessage {
    const NAME: &'static str = "forwardMessage";
    type Response = Message;
}

#[derive(Debug, Clone, Serialize)]
pub struct EditMessageText {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl EditMessageText {
    pub fn new(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }
}

impl Method for EditMessageText {
    const NAME: &'static str = "editMessageText";
    type Response = Message;
}

#[derive(Debug, Clone, Serialize)]
pub struct EditMessageReplyMarkup {
    pub chat_id: i64,
    pub message_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl Method for EditMessageReplyMarkup {
    const NAME: &'static str = "editMessageReplyMarkup";
    type Response = Message;
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteMessage {
    pub chat_id: i64,
    pub message_id: i64,
}

impl Method for DeleteMessage {
    const NAME: &'static str = "deleteMessage";
    type Response = bool;
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerCallbackQuery {
    pub callback_query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_alert: Option<bool>,
}

impl AnswerCallbackQuery {
    pub fn new(callback_query_id: impl Into<String>) -> Self {
        Self {
            callback_query_id: callback_query_id.into(),
            text: None,
            show_alert: None,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl Method for AnswerCallbackQuery {
    const NAME: &'static str = "answerCallbackQuery";
    type Response = bool;
}

#[derive(Debug, Clone, Serialize)]
pub struct SendChatAction {
    pub chat_id: i64,
    pub action: String,
}

impl SendChatAction {
    pub fn typing(chat_id: i64) -> Self {
        Self {
            chat_id,
            action: "typing".to_string(),
        }
    }
}

impl Method for SendChatAction {
    const NAME: &'static str = "sendChatAction";
    type Response = bool;
}

#[derive(Debug, Serialize)]
pub struct SendPhoto {
    pub chat_id: i64,
    pub photo: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl SendPhoto {
    pub fn new(chat_id: i64, photo: InputFile) -> Self {
        Self {
            chat_id,
            photo,
            caption: None,
        }
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

impl Method for SendPhoto {
    const NAME: &'static str = "sendPhoto";
    type Response = Message;

    fn take_uploads(&mut self) -> Vec<FilePart> {
        self.photo.take_part("photo").into_iter().collect()
    }
}

#[derive(Debug, Serialize)]
pub struct SendDocument {
    pub chat_id: i64,
    pub document: InputFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl SendDocument {
    pub fn new(chat_id: i64, document: InputFile) -> Self {
        Self {
            chat_id,
            document,
            caption: None,
        }
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

impl Method for SendDocument {
    const NAME: &'static str = "sendDocument";
    type Response = Message;

    fn take_uploads(&mut self) -> Vec<FilePart> {
        self.document.take_part("document").into_iter().collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetWebhook {
    pub url: String,
}

impl Method for SetWebhook {
    const NAME: &'static str = "setWebhook";
    type Response = bool;
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteWebhook {}

impl Method for DeleteWebhook {
    const NAME: &'static str = "deleteWebhook";
    type Response = bool;
}
