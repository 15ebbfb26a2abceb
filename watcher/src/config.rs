//! Process configuration.
//!
//! Every option is a long flag with an environment-variable fallback.
//! [`Args`] is the raw clap view; [`Config::from_args`] validates it once at
//! startup and is the only place a [`ConfigError`] can come from.

use clap::Parser;
use shared::DEFAULT_PORT;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::notifier::DEFAULT_API_URL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None, args_override_self = true)]
pub struct Args {
    /// Game server host to probe
    #[arg(long, env = "SERVER_HOST")]
    pub host: Option<String>,

    /// Game server port
    #[arg(long, env = "SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat receiving notifications (group ids are negative)
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true)]
    pub telegram_chat_id: Option<String>,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    pub telegram_api_url: String,

    /// File holding the observation log
    #[arg(long, env = "STATUS_FILE", default_value = "status.json")]
    pub store_path: PathBuf,

    /// Chat title text shown after the status dot
    #[arg(long, env = "CHAT_TITLE", default_value = "minecraft server")]
    pub title: String,

    /// Seconds between check cycles
    #[arg(long, env = "CHECK_INTERVAL_SECS", default_value_t = 30)]
    pub check_interval_secs: u64,

    /// Seconds between retention prunes
    #[arg(long, env = "CLEANUP_INTERVAL_SECS", default_value_t = 86_400)]
    pub cleanup_interval_secs: u64,

    /// Hours of observations to keep
    #[arg(long, env = "RETENTION_HOURS", default_value_t = 24)]
    pub retention_hours: u64,

    /// Probe attempts per check cycle
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Seconds to wait between probe attempts
    #[arg(long, env = "RETRY_DELAY_SECS", default_value_t = 3)]
    pub retry_delay_secs: u64,

    /// Probe connect and exchange timeout in seconds
    #[arg(long, env = "PROBE_TIMEOUT_SECS", default_value_t = 3)]
    pub timeout_secs: u64,
}

/// Validated configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,
    pub store_path: PathBuf,
    pub title: String,
    pub check_interval: Duration,
    pub cleanup_interval: Duration,
    pub retention: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub probe_timeout: Duration,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let host = required("SERVER_HOST", args.host)?;
        let telegram_token = required("TELEGRAM_BOT_TOKEN", args.telegram_token)?;
        let telegram_chat_id = required("TELEGRAM_CHAT_ID", args.telegram_chat_id)?;

        let check_interval = positive_secs("CHECK_INTERVAL_SECS", args.check_interval_secs)?;
        let cleanup_interval = positive_secs("CLEANUP_INTERVAL_SECS", args.cleanup_interval_secs)?;
        let probe_timeout = positive_secs("PROBE_TIMEOUT_SECS", args.timeout_secs)?;

        let retention = retention_window(args.retention_hours)?;
        if args.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "MAX_RETRIES",
                reason: "must be at least one",
            });
        }

        Ok(Self {
            host,
            port: args.port,
            telegram_token,
            telegram_chat_id,
            telegram_api_url: args.telegram_api_url,
            store_path: args.store_path,
            title: args.title,
            check_interval,
            cleanup_interval,
            retention,
            max_retries: args.max_retries,
            retry_delay: Duration::from_secs(args.retry_delay_secs),
            probe_timeout,
        })
    }

}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::Missing(field)),
    }
}

/// Hours to a window whose millisecond count fits an `i64` timestamp.
fn retention_window(hours: u64) -> Result<Duration, ConfigError> {
    if hours == 0 {
        return Err(ConfigError::Invalid {
            field: "RETENTION_HOURS",
            reason: "must be greater than zero",
        });
    }
    match hours.checked_mul(60 * 60 * 1000) {
        Some(ms) if ms <= i64::MAX as u64 => Ok(Duration::from_secs(hours * 60 * 60)),
        _ => Err(ConfigError::Invalid {
            field: "RETENTION_HOURS",
            reason: "too large",
        }),
    }
}

fn positive_secs(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero",
        });
    }
    Ok(Duration::from_secs(secs))
}
