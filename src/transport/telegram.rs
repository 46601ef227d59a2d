//! Delivery through the Telegram Bot API.
//!
//! Chunks are parsed back into plain text plus entities rather than sent
//! with `parse_mode`, so custom emoji and expandable quotes survive and
//! offsets are exactly what the API expects (UTF-16 code units).

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app::{DigestError, Result};
use crate::config::TelegramConfig;
use crate::digest::Digest;
use crate::markup::{self, Span, SpanKind};
use crate::memes::Meme;
use crate::transport::Transport;

pub struct TelegramTransport {
    client: Client,
    api_url: String,
    token: String,
    chat_id: i64,
}

#[derive(Debug, Serialize, PartialEq)]
struct EntityUser {
    id: i64,
    is_bot: bool,
    first_name: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct MessageEntity {
    #[serde(rename = "type")]
    kind: &'static str,
    offset: usize,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<EntityUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_emoji_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct LinkPreviewOptions {
    is_disabled: bool,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    entities: Vec<MessageEntity>,
    link_preview_options: LinkPreviewOptions,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl From<Span> for MessageEntity {
    fn from(span: Span) -> Self {
        let mut entity = MessageEntity {
            kind: "",
            offset: span.offset,
            length: span.length,
            url: None,
            user: None,
            language: None,
            custom_emoji_id: None,
        };

        entity.kind = match span.kind {
            SpanKind::Bold => "bold",
            SpanKind::Italic => "italic",
            SpanKind::Underline => "underline",
            SpanKind::Strike => "strikethrough",
            SpanKind::Code => "code",
            SpanKind::Pre { language } => {
                entity.language = Some(language).filter(|l| !l.is_empty());
                "pre"
            }
            SpanKind::Blockquote { collapsed: true } => "expandable_blockquote",
            SpanKind::Blockquote { collapsed: false } => "blockquote",
            SpanKind::Spoiler => "spoiler",
            SpanKind::Url => "url",
            SpanKind::Email => "email",
            SpanKind::TextLink { url } => {
                entity.url = Some(url);
                "text_link"
            }
            SpanKind::Mention { user_id } => {
                entity.user = Some(EntityUser {
                    id: user_id,
                    is_bot: false,
                    first_name: String::new(),
                });
                "text_mention"
            }
            SpanKind::CustomEmoji { document_id } => {
                entity.custom_emoji_id = Some(document_id.to_string());
                "custom_emoji"
            }
        };

        entity
    }
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig, client: Client) -> Result<Self> {
        let token = config
            .bot_token
            .clone()
            .ok_or_else(|| DigestError::Config("telegram.bot_token is not set".into()))?;
        let chat_id = config
            .chat_id
            .ok_or_else(|| DigestError::Config("telegram.chat_id is not set".into()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn message_body(&self, chunk: &str) -> (String, Vec<MessageEntity>) {
        let rich = markup::parse(chunk);
        let entities = rich.utf16_spans().into_iter().map(MessageEntity::from).collect();
        (rich.text, entities)
    }

    async fn send_message(&self, chunk: &str) -> Result<()> {
        let (text, entities) = self.message_body(chunk);
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id: self.chat_id,
                text: &text,
                entities,
                link_preview_options: LinkPreviewOptions { is_disabled: true },
            })
            .send()
            .await?;

        check(response).await
    }

    async fn send_photo(&self, meme: &Meme) -> Result<()> {
        let photo = Part::bytes(meme.image.clone()).file_name("meme.png");
        let form = Form::new()
            .text("chat_id", self.chat_id.to_string())
            .part("photo", photo);

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        check(response).await
    }
}

async fn check(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body: ApiResponse = response.json().await?;
    if body.ok {
        return Ok(());
    }
    Err(DigestError::Transport(format!(
        "{}: {}",
        status,
        body.description.unwrap_or_default()
    )))
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        for chunk in &digest.chunks {
            self.send_message(chunk).await?;
        }
        for meme in &digest.memes {
            if let Err(e) = self.send_photo(meme).await {
                tracing::warn!("Failed to send meme for {}: {}", meme.candidate.title, e);
            }
        }
        tracing::info!(
            "Delivered {} messages and {} memes",
            digest.chunks.len(),
            digest.memes.len()
        );
        Ok(())
    }
}
