//! Seedbot Telegram binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx QB_USER=admin QB_PASS=xxx cargo run -p seedbot-telegram
//! ```

use std::sync::Arc;

use clap::Parser;
use seedbot_queue::{BackendConfig, Notifier, QbittorrentClient, QueueConfig, TorrentRuntime};
use seedbot_telegram::{BotConfig, BotState, SeedBot, TelegramNotifier};
use teloxide::Bot;
use tracing_subscriber::EnvFilter;

/// Seedbot - queue torrent downloads from Telegram
#[derive(Parser, Debug)]
#[command(name = "seedbot-telegram")]
#[command(about = "Telegram bot that feeds a qBittorrent download queue")]
struct Args {
    /// Fail downloads that have not finished after this many minutes
    #[arg(long, env = "TORRENT_MAX_MINUTES")]
    max_minutes: Option<u64>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> seedbot_telegram::Result<()> {
    // Load .env.local or .env before reading any configuration
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let args = Args::parse();

    let filter = match args.verbose {
        0 => "seedbot_telegram=info,seedbot_queue=info,teloxide=warn",
        1 => "seedbot_telegram=debug,seedbot_queue=debug,teloxide=info",
        2 => "seedbot_telegram=trace,seedbot_queue=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bot_config = BotConfig::from_env()?;
    let backend_config = BackendConfig::from_env()?;
    tracing::info!(
        url = %backend_config.base_url,
        download_dir = %backend_config.download_dir.display(),
        "qBittorrent backend configured"
    );

    let mut queue_config = QueueConfig::default();
    if let Some(minutes) = args.max_minutes {
        queue_config = queue_config.with_max_job_minutes(minutes);
    }

    let backend_url = backend_config.base_url.clone();
    let backend = Arc::new(QbittorrentClient::new(backend_config));
    let mut runtime = TorrentRuntime::new(backend, queue_config);
    runtime.start()?;

    let bot = Bot::new(&bot_config.token);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));
    let state = Arc::new(BotState::new(
        runtime.queue(),
        runtime.backend(),
        notifier,
        bot_config.authorized_users.clone(),
        backend_url,
    ));
    let seedbot = SeedBot::new(bot, state);

    match seedbot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[robot] Seedbot");
            println!("   Bot: @{}", username);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e);
        }
    }

    println!("\n[phone] Send /torrent <magnet> to start a download");
    println!("   Press Ctrl+C to stop\n");

    seedbot.start_polling().await?;
    runtime.shutdown().await?;

    Ok(())
}
