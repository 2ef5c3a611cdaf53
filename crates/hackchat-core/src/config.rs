use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::UserId, errors::Error, Result};

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_BROADCAST_PACING: Duration = Duration::from_millis(50);

/// Typed configuration for the relay bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub admin_id: UserId,

    // Relay
    pub history_capacity: usize,
    pub broadcast_pacing: Duration,

    // Outbound throttling
    pub throttle_global_interval: Duration,
    pub throttle_per_chat_interval: Duration,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in `load`).
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let u64_of = |key: &str| get(key).and_then(|s| s.trim().parse::<u64>().ok());

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| get("TELEGRAM_TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let admin_id = match get("ADMIN_ID") {
            Some(raw) => raw.trim().parse::<i64>().map(UserId).map_err(|_| {
                Error::Config(format!("ADMIN_ID must be a numeric Telegram id, got {raw:?}"))
            })?,
            None => {
                return Err(Error::Config(
                    "ADMIN_ID environment variable is required".to_string(),
                ))
            }
        };

        let history_capacity = get("HISTORY_CAPACITY")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_HISTORY_CAPACITY)
            .max(1);
        let broadcast_pacing = u64_of("BROADCAST_PACING_MS")
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BROADCAST_PACING);

        // ~25/sec globally, ~0.95/sec per chat.
        let throttle_global_interval =
            Duration::from_millis(u64_of("THROTTLE_GLOBAL_MS").unwrap_or(40));
        let throttle_per_chat_interval =
            Duration::from_millis(u64_of("THROTTLE_PER_CHAT_MS").unwrap_or(1050));

        let audit_log_path = PathBuf::from(
            get("AUDIT_LOG_PATH").unwrap_or("/tmp/hackchat-audit.log".to_string()),
        );
        let audit_log_json = get("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            admin_id,
            history_capacity,
            broadcast_pacing,
            throttle_global_interval,
            throttle_per_chat_interval,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
