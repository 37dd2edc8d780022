//! Bot configuration from the environment.
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather (required)
//! - `AUTHORIZED_USER_IDS`: Comma-separated Telegram user ids
//! - `AUTHORIZED_IDS_FILE`: CSV whose first column holds user ids (default: `user.csv`)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{BotError, Result};

/// Environment variable for the bot token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable for inline user ids.
pub const AUTHORIZED_IDS_ENV: &str = "AUTHORIZED_USER_IDS";

/// Environment variable for the user id file.
pub const AUTHORIZED_FILE_ENV: &str = "AUTHORIZED_IDS_FILE";

const DEFAULT_AUTHORIZED_FILE: &str = "user.csv";

/// Settings for the Telegram front end.
#[derive(Clone)]
pub struct BotConfig {
    /// Bot API token.
    pub token: String,
    /// Users allowed to talk to the bot.
    pub authorized_users: HashSet<u64>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"***")
            .field("authorized_users", &self.authorized_users)
            .finish()
    }
}

impl BotConfig {
    /// Load settings from the environment.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(BotError::NoToken)?;

        let mut authorized_users = std::env::var(AUTHORIZED_IDS_ENV)
            .map(|ids| parse_id_list(&ids))
            .unwrap_or_default();

        let file = std::env::var(AUTHORIZED_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_AUTHORIZED_FILE));
        if file.exists() {
            authorized_users.extend(load_id_file(&file)?);
        }

        if authorized_users.is_empty() {
            warn!("no authorized users configured; every request will be denied");
        } else {
            info!(count = authorized_users.len(), "loaded authorized users");
        }

        Ok(Self {
            token,
            authorized_users,
        })
    }
}

/// Parse `"1, 2,3"` into a set of ids. Invalid entries are skipped.
pub fn parse_id_list(list: &str) -> HashSet<u64> {
    list.split(',').filter_map(parse_id).collect()
}

/// Read user ids from the first column of a CSV file.
pub fn load_id_file(path: &Path) -> Result<HashSet<u64>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| line.split(',').next())
        .filter_map(parse_id)
        .collect())
}

fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(entry = %raw, "ignoring invalid user id");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list(" 42,7 ,,abc, 9");
        assert_eq!(ids, HashSet::from([42, 7, 9]));
    }

    #[test]
    fn test_load_id_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "796058175,owner").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  12345  ").unwrap();
        writeln!(file, "user_id,comment").unwrap();

        let ids = load_id_file(file.path()).unwrap();
        assert_eq!(ids, HashSet::from([796058175, 12345]));
    }

    #[test]
    fn test_debug_hides_token() {
        let config = BotConfig {
            token: "123:secret".to_string(),
            authorized_users: HashSet::from([1]),
        };
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
