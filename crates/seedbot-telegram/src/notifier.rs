//! Delivers queue notices as Telegram messages.

use async_trait::async_trait;
use seedbot_queue::Notifier;
use teloxide::prelude::*;
use tracing::warn;

/// [`Notifier`] backed by the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> bool {
        match self.bot.send_message(ChatId(chat_id), text).await {
            Ok(_) => true,
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to send notification");
                false
            }
        }
    }
}
