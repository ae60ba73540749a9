// =============================================================================
// Alert delivery — sink trait and the Telegram implementation
// =============================================================================
//
// SECURITY: the bot token is part of the request URL and is never logged.
//
// Delivery is strictly fire-and-report: a sink returns an error and the
// caller decides whether to retry or drop.  Nothing in here can affect
// pipeline output.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::types::TradeSignal;

/// Outbound notification channel for emitted signals and system messages.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_signal(&self, signal: &TradeSignal) -> Result<()>;
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Telegram Bot API sink (sendMessage with Markdown formatting).
#[derive(Clone)]
pub struct TelegramAlerts {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramAlerts {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build reqwest client for TelegramAlerts"),
        }
    }

    async fn post(&self, text: &str) -> Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .context("telegram sendMessage request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("telegram API returned {status}: {body}");
        }

        debug!("telegram alert delivered");
        Ok(())
    }
}

#[async_trait]
impl AlertSink for TelegramAlerts {
    #[instrument(skip(self, signal), fields(symbol = %signal.symbol), name = "telegram::send_signal")]
    async fn send_signal(&self, signal: &TradeSignal) -> Result<()> {
        self.post(&format_signal(signal)).await
    }

    #[instrument(skip(self, text), name = "telegram::send_message")]
    async fn send_message(&self, text: &str) -> Result<()> {
        self.post(&format!("⚠️ {text}")).await
    }
}

impl std::fmt::Debug for TelegramAlerts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAlerts")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &"<redacted>")
            .finish()
    }
}

/// Render the Markdown alert card for one signal.
pub fn format_signal(signal: &TradeSignal) -> String {
    format!(
        "📈 *Trade Alert: {}*\n\
         🎯 *Action:* {}\n\
         📌 *Entry Range:* {:.2} - {:.2}\n\
         🚨 *Stop Loss:* {:.2}\n\
         💰 *Take Profit:* {:.2}\n\
         📊 *Confidence Score:* {:.1}%\n\
         #StockMarket #TradingBot",
        signal.symbol,
        signal.action,
        signal.entry_range.0,
        signal.entry_range.1,
        signal.stop_loss,
        signal.take_profit,
        signal.confidence
    )
}
