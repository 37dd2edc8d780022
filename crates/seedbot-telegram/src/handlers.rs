//! Command handlers for the Telegram bot.

use std::sync::Arc;

use seedbot_queue::{JobDescriptor, QueueError};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Document;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::state::BotState;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Queue a download: /torrent <magnet>, or reply to a .torrent file")]
    Torrent(String),

    #[command(description = "Show the active download and queue")]
    TorrentStatus,
}

const ACCESS_DENIED: &str = "🚫 Access denied. You are not allowed to use this bot.";

const TORRENT_USAGE: &str = "📥 How to use /torrent:\n\n\
    1. Magnet link:\n/torrent magnet:?xt=...\n\n\
    2. .torrent file:\nReply to a message containing a .torrent file with /torrent";

/// Reply shown once a job is queued.
pub fn queued_reply(kind: &str, name: &str, position: usize) -> String {
    format!(
        "📥 {} added to queue\n\nName: {}\nQueue position: {}",
        kind, name, position
    )
}

/// Reply shown when the backend cannot be reached.
pub fn unreachable_reply(backend_url: &str) -> String {
    format!(
        "❌ Cannot connect to qBittorrent WebUI\n\n\
        Check that:\n\
        • the WebUI is running at {}\n\
        • QB_USER and QB_PASS are correct\n\
        • no firewall blocks the port",
        backend_url
    )
}

/// The first whitespace-separated token of a command argument.
pub fn first_arg(arg: &str) -> Option<&str> {
    arg.split_whitespace().next()
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(
        msg.chat.id,
        "Welcome to Seedbot! 🚀\n\n\
        Send /torrent with a magnet link, or reply to a .torrent file with /torrent.\n\
        Use /torrentstatus to see progress.\n\n\
        Type /help for all commands.",
    )
    .await?;
    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Handle the /torrent command.
pub async fn handle_torrent(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    arg: String,
) -> ResponseResult<()> {
    let requester = state.requester(msg.chat.id.0);

    let (kind, job) = if let Some(magnet) = first_arg(&arg) {
        match JobDescriptor::magnet(magnet, requester) {
            Ok(job) => ("Magnet", job),
            Err(QueueError::InvalidMagnet(_)) => {
                bot.send_message(
                    msg.chat.id,
                    "❌ Invalid magnet link. It must start with magnet:",
                )
                .await?;
                return Ok(());
            }
            Err(e) => {
                bot.send_message(msg.chat.id, format!("Error: {}", e)).await?;
                return Ok(());
            }
        }
    } else if let Some(doc) = msg.reply_to_message().and_then(|m| m.document()) {
        let file_name = doc.file_name.clone().unwrap_or_default();
        if !file_name.to_ascii_lowercase().ends_with(".torrent") {
            bot.send_message(msg.chat.id, "❌ The replied file is not a .torrent")
                .await?;
            return Ok(());
        }

        let content = match download_document(&bot, doc).await {
            Ok(content) => content,
            Err(e) => {
                warn!(chat_id = %msg.chat.id, error = %e, "Failed to download torrent file");
                bot.send_message(msg.chat.id, format!("❌ Failed to download torrent file: {}", e))
                    .await?;
                return Ok(());
            }
        };

        match JobDescriptor::torrent_file(&file_name, content, requester) {
            Ok(job) => ("Torrent file", job),
            Err(e) => {
                bot.send_message(msg.chat.id, format!("❌ {}", e)).await?;
                return Ok(());
            }
        }
    } else {
        bot.send_message(msg.chat.id, TORRENT_USAGE).await?;
        return Ok(());
    };

    // Refuse early if the backend is down rather than queueing a doomed job.
    if let Err(e) = state.backend().authenticate().await {
        warn!(chat_id = %msg.chat.id, error = %e, "Backend preflight failed");
        bot.send_message(msg.chat.id, unreachable_reply(state.backend_url()))
            .await?;
        return Ok(());
    }

    let name = job.display_name().to_string();
    let position = state.queue().enqueue(job).await;
    info!(chat_id = %msg.chat.id, job = %name, position, "Torrent queued");

    bot.send_message(msg.chat.id, queued_reply(kind, &name, position))
        .await?;
    Ok(())
}

async fn download_document(bot: &Bot, doc: &Document) -> Result<Vec<u8>, String> {
    let file = bot
        .get_file(doc.file.id.clone())
        .await
        .map_err(|e| e.to_string())?;
    let mut content = Vec::new();
    bot.download_file(&file.path, &mut content)
        .await
        .map_err(|e| e.to_string())?;
    Ok(content)
}

/// Handle the /torrentstatus command.
pub async fn handle_torrent_status(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let snapshot = state.queue().snapshot().await;
    bot.send_message(msg.chat.id, snapshot.render()).await?;
    Ok(())
}

/// Main command dispatcher.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0);
    if !user_id.is_some_and(|id| state.is_authorized(id)) {
        warn!(chat_id = %msg.chat.id, user_id = ?user_id, "Unauthorized access attempt");
        bot.send_message(msg.chat.id, ACCESS_DENIED).await?;
        return Ok(());
    }

    match cmd {
        Command::Start => handle_start(bot, msg).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Torrent(arg) => handle_torrent(bot, msg, state, arg).await,
        Command::TorrentStatus => handle_torrent_status(bot, msg, state).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd = Command::parse("/torrent magnet:?xt=urn:btih:abc", "seedbot").unwrap();
        assert!(matches!(cmd, Command::Torrent(arg) if arg == "magnet:?xt=urn:btih:abc"));

        let cmd = Command::parse("/torrentstatus", "seedbot").unwrap();
        assert!(matches!(cmd, Command::TorrentStatus));

        let cmd = Command::parse("/torrent", "seedbot").unwrap();
        assert!(matches!(cmd, Command::Torrent(arg) if arg.is_empty()));
    }

    #[test]
    fn test_first_arg() {
        assert_eq!(first_arg("  magnet:?a  extra"), Some("magnet:?a"));
        assert_eq!(first_arg("   "), None);
    }

    #[test]
    fn test_replies() {
        let reply = queued_reply("Magnet", "debian", 2);
        assert!(reply.contains("Name: debian"));
        assert!(reply.contains("Queue position: 2"));
        assert!(unreachable_reply("http://127.0.0.1:8080").contains("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_help_lists_torrent_commands() {
        let help = Command::descriptions().to_string();
        assert!(help.contains("/torrent"));
        assert!(help.contains("/torrentstatus"));
    }
}
