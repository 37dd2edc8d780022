//! Notification capability used by the worker to reach the requester.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

/// Width of the progress bar in progress notices.
const NOTICE_BAR_WIDTH: usize = 10;

/// Name length shown in progress notices.
const NOTICE_NAME_LEN: usize = 30;

/// Best-effort message delivery to a chat.
///
/// Implementations must never fail the caller: delivery errors are logged
/// and reported through the returned flag only.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `text` to `chat_id`. Returns whether delivery succeeded.
    async fn send(&self, chat_id: i64, text: &str) -> bool;
}

/// Status changes reported to the requester of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The worker claimed the job.
    Started { name: String },
    /// The job is being handed to the backend.
    Submitting,
    /// The backend accepted the job.
    Added,
    /// Periodic progress while downloading.
    Progress {
        name: String,
        percent: u8,
        state: String,
    },
    /// The download finished.
    Completed { name: String, save_path: PathBuf },
    /// The job was abandoned.
    Failed { reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Started { name } => write!(f, "🔄 Processing torrent:\n{}", name),
            Notice::Submitting => write!(f, "📤 Sending to qBittorrent..."),
            Notice::Added => write!(f, "✅ Added! Watching progress..."),
            Notice::Progress {
                name,
                percent,
                state,
            } => write!(
                f,
                "📊 Progress update:\n{}\n{}% {} ({})",
                truncate_chars(name, NOTICE_NAME_LEN),
                percent,
                progress_bar(*percent, NOTICE_BAR_WIDTH),
                state
            ),
            Notice::Completed { name, save_path } => write!(
                f,
                "🎉 Download finished!\n{}\n📂 Location: {}",
                name,
                save_path.display()
            ),
            Notice::Failed { reason } => write!(f, "❌ Torrent failed: {}", reason),
        }
    }
}

/// Render a text progress bar of `width` cells.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = usize::from(percent.min(100));
    let filled = width * percent / 100;
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}

/// Truncate to at most `max` characters on a character boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 10), "░░░░░░░░░░");
        assert_eq!(progress_bar(42, 10), "████░░░░░░");
        assert_eq!(progress_bar(100, 10), "██████████");
        assert_eq!(progress_bar(250, 4), "████");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 5), "ab");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn test_notice_text() {
        let progress = Notice::Progress {
            name: "ubuntu-24.04-desktop-amd64.iso and some more text".to_string(),
            percent: 50,
            state: "downloading".to_string(),
        };
        let text = progress.to_string();
        assert!(text.contains("50%"));
        assert!(text.contains("█████░░░░░"));
        assert!(!text.contains("some more text"));

        let done = Notice::Completed {
            name: "ubuntu.iso".to_string(),
            save_path: PathBuf::from("/srv/downloads"),
        };
        assert!(done.to_string().contains("/srv/downloads"));

        let failed = Notice::Failed {
            reason: "cannot connect to backend".to_string(),
        };
        assert!(failed.to_string().contains("cannot connect to backend"));
    }
}
