//! Telegram Bot API notifier.
//!
//! API docs: https://core.telegram.org/bots/api#sendmessage
//! Auth: bot token embedded in the request path.
//!
//! Entry messages carry a link to the table and are sent as HTML;
//! everything else goes out as MarkdownV2 with every reserved character
//! in the text escaped and only the template's bold/italic markers left raw.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, warn};

use super::{Notification, NotificationKind, Notifier, Segment};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Characters MarkdownV2 requires escaping outside of entities.
const MARKDOWN_V2_RESERVED: [char; 19] = [
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
    '!',
];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
    MarkdownV2,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: ParseMode,
    disable_web_page_preview: bool,
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Escape text for MarkdownV2. Square brackets are left alone when the
/// text is itself a link label.
pub fn escape_markdown_v2(text: &str, for_link: bool) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        let bracket = c == '[' || c == ']';
        let reserved = MARKDOWN_V2_RESERVED.contains(&c) && !(for_link && bracket);
        if reserved {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Minimal HTML escaping for text nodes.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Final message body and parse mode for one notification.
pub fn format_message(
    table: &str,
    notification: &Notification,
    table_link: Option<&str>,
) -> (String, ParseMode) {
    match (notification.kind(), table_link) {
        (NotificationKind::Entry, Some(link)) => (
            format!(
                "{}\n🔗 <a href='{}'>Open table</a>",
                escape_html(&notification.render(table)),
                escape_html(link)
            ),
            ParseMode::Html,
        ),
        _ => (render_markdown_v2(table, notification), ParseMode::MarkdownV2),
    }
}

/// MarkdownV2 body: text escaped, formatting markers kept.
fn render_markdown_v2(table: &str, notification: &Notification) -> String {
    notification
        .segments(table)
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => escape_markdown_v2(text, false),
            Segment::Marker(marker) => (*marker).to_string(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Sends notifications to one Telegram chat.
pub struct TelegramNotifier {
    http: Client,
    token: SecretString,
    chat_id: String,
    api_base: String,
    table_link: Option<String>,
}

impl TelegramNotifier {
    pub fn new(
        token: SecretString,
        chat_id: String,
        api_base: Option<String>,
        table_link: Option<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("SERPENT/0.1.0 (roulette-monitor)")
            .build()
            .context("Failed to build HTTP client for Telegram")?;

        Ok(Self {
            http,
            token,
            chat_id,
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            table_link,
        })
    }

    async fn send(&self, text: &str, parse_mode: ParseMode) -> Result<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.token.expose_secret()
        );
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Telegram sendMessage request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, table: &str, notification: &Notification) {
        let (text, parse_mode) = format_message(table, notification, self.table_link.as_deref());
        match self.send(&text, parse_mode).await {
            Ok(()) => debug!(table = %table, kind = ?notification.kind(), "Telegram message sent"),
            Err(e) => warn!(
                table = %table,
                kind = ?notification.kind(),
                error = %e,
                "Telegram delivery failed"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
