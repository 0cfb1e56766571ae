//! Configuration types, read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Parse a variable's value, or fall back to `default` when it is unset or
/// blank. A value that is set but unparsable is an error.
pub(crate) fn parse_var<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a boolean"),
        }),
    }
}

/// Bot-wide configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// libSQL database file.
    pub db_path: PathBuf,
    /// Port of the admin REST server.
    pub http_port: u16,
    /// Sessions and per-user workers idle for this long are dropped.
    pub session_idle_timeout: Duration,
    /// How often idle sessions are swept.
    pub prune_interval: Duration,
    /// Explicit CLI switch. `None` means "on unless Telegram is configured".
    pub cli: Option<bool>,
    /// User id the CLI speaks as.
    pub cli_user_id: i64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/nutri-bot.db"),
            http_port: 8080,
            session_idle_timeout: Duration::from_secs(86_400), // 24 hours
            prune_interval: Duration::from_secs(600),          // 10 minutes
            cli: None,
            cli_user_id: 1,
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path = var("NUTRI_BOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let http_port: u16 = parse_var(
            "NUTRI_BOT_HTTP_PORT",
            var("NUTRI_BOT_HTTP_PORT"),
            defaults.http_port,
        )?;

        let idle_secs: u64 = parse_var(
            "NUTRI_BOT_SESSION_IDLE_SECS",
            var("NUTRI_BOT_SESSION_IDLE_SECS"),
            defaults.session_idle_timeout.as_secs(),
        )?;

        Ok(Self {
            db_path,
            http_port,
            session_idle_timeout: Duration::from_secs(idle_secs),
            prune_interval: defaults.prune_interval,
            cli: parse_flag("NUTRI_BOT_CLI", var("NUTRI_BOT_CLI"))?,
            cli_user_id: parse_var(
                "NUTRI_BOT_CLI_USER_ID",
                var("NUTRI_BOT_CLI_USER_ID"),
                defaults.cli_user_id,
            )?,
        })
    }

    /// Whether to attach the stdin/stdout channel.
    pub fn cli_enabled(&self, telegram_enabled: bool) -> bool {
        self.cli.unwrap_or(!telegram_enabled)
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Usernames or numeric ids; `*` allows everyone.
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    /// Returns `None` when `TELEGRAM_BOT_TOKEN` is not set.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let token = var("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty())?;

        let allowed_users: Vec<String> = var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Some(Self {
            bot_token: SecretString::from(token),
            allowed_users,
        })
    }

    pub fn allows_everyone(&self) -> bool {
        self.allowed_users.iter().any(|u| u == "*")
    }
}
