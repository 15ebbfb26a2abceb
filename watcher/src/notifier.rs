//! Chat notifications through the Telegram Bot API.
//!
//! Delivery is best effort: callers log a [`NotifyError`] and move on.

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Client-side timeout for every Bot API call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("telegram API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
}

/// Destination for change messages and the status title.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;
    async fn set_channel_title(&self, title: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api { status, body });
        }

        debug!("Telegram {} succeeded", method);
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }),
        )
        .await
    }

    async fn set_channel_title(&self, title: &str) -> Result<(), NotifyError> {
        self.call(
            "setChatTitle",
            json!({
                "chat_id": self.chat_id,
                "title": title,
            }),
        )
        .await
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn bold(text: &str) -> String {
    format!("<b>{}</b>", escape_html(text))
}

/// Renders join/leave changes as a chat message, or `None` if there are none.
pub fn format_changes(joined: &[String], left: &[String]) -> Option<String> {
    let mut lines = Vec::new();

    match joined {
        [] => {}
        [player] => lines.push(format!("😎 {} joined the server", bold(player))),
        players => lines.push(format!("😎 joined the server: {}", bold_list(players))),
    }

    match left {
        [] => {}
        [player] => lines.push(format!("🥺 {} left the server", bold(player))),
        players => lines.push(format!("🥺 left the server: {}", bold_list(players))),
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn bold_list(players: &[String]) -> String {
    players
        .iter()
        .map(|p| bold(p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Channel title reflecting the liveness verdict.
pub fn chat_title(online: bool, title: &str) -> String {
    let dot = if online { "🟢" } else { "🔴" };
    format!("{} {}", dot, title)
}
