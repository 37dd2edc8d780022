//! Telegram front end for the Seedbot torrent queue.
//!
//! Operators queue downloads with `/torrent <magnet>` (or by replying to a
//! `.torrent` file with `/torrent`) and check on them with `/torrentstatus`.
//! Progress and completion notices are delivered back to the submitting
//! chat through [`TelegramNotifier`].
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `QB_USER`, `QB_PASS`: qBittorrent WebUI credentials
//!
//! Optional:
//! - `QB_URL`: WebUI address (default: `http://127.0.0.1:8080`)
//! - `DOWNLOAD_DIR`: Save path for downloads
//! - `AUTHORIZED_USER_IDS` / `AUTHORIZED_IDS_FILE`: Who may use the bot
//!
//! # Commands
//!
//! - `/start` - Welcome message
//! - `/help` - Show available commands
//! - `/torrent <magnet>` - Queue a magnet link
//! - `/torrentstatus` - Show the active download and the queue

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod notifier;
pub mod state;

pub use bot::SeedBot;
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use notifier::TelegramNotifier;
pub use state::BotState;
