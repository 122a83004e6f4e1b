//! Runtime configuration, read from the environment.

use std::{env, fmt::Display, str::FromStr};

use anyhow::{format_err, Result};
use lettre::message::Mailbox;
use tracing::{info, warn};

pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://lastweek.sqlite?mode=rwc";
pub const DEFAULT_MAIL_SENDER: &str = "lastweek <noreply@lastweek.local>";
pub const DEFAULT_MAIL_SUBJECT_PREFIX: &str = "[lastweek] ";
pub const DEFAULT_SNIPPETS_PER_PAGE: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the server binds to
    pub addr: String,
    pub database_url: String,
    /// Sessions are kept in memory when unset
    pub redis_url: Option<String>,
    /// Key sealing API, confirmation and reset tokens
    pub secret_key: [u8; 32],
    /// `Domain` attribute of the session cookie
    pub domain: Option<String>,
    pub secure_cookies: bool,
    /// Mail is logged instead of sent when unset
    pub smtp_url: Option<String>,
    pub mail_sender: Mailbox,
    pub mail_subject_prefix: String,
    pub snippets_per_page: u64,
    /// Enables the `fill-db` command
    pub dev: bool,
}

impl Config {
    /// A configuration with every default in place and the given secret.
    pub fn with_secret(secret_key: [u8; 32]) -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            redis_url: None,
            secret_key,
            domain: None,
            secure_cookies: false,
            smtp_url: None,
            mail_sender: DEFAULT_MAIL_SENDER
                .parse()
                .expect("default mail sender is a valid mailbox"),
            mail_subject_prefix: DEFAULT_MAIL_SUBJECT_PREFIX.to_owned(),
            snippets_per_page: DEFAULT_SNIPPETS_PER_PAGE,
            dev: false,
        }
    }

    /// Attempt to load the configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let secret_key = parse_secret_key(
            &env::var("SECRET_KEY").map_err(|_| format_err!("SECRET_KEY is not set in env"))?,
        )?;

        let mut config = Self::with_secret(secret_key);
        config.addr = try_load("ADDR", DEFAULT_ADDR)?;
        config.database_url = try_load("DATABASE_URL", DEFAULT_DATABASE_URL)?;
        config.redis_url = optional("REDIS_URL");
        config.domain = optional("DOMAIN");
        config.secure_cookies = try_load("SECURE_COOKIES", "false")?;
        config.smtp_url = optional("SMTP_URL");
        config.mail_sender = try_load("LASTWEEK_MAIL_SENDER", DEFAULT_MAIL_SENDER)?;
        config.mail_subject_prefix =
            try_load("LASTWEEK_MAIL_SUBJECT_PREFIX", DEFAULT_MAIL_SUBJECT_PREFIX)?;
        config.snippets_per_page = try_load("LASTWEEK_SNIPPETS_PER_PAGE", "10")?;
        config.dev = try_load("LASTWEEK_DEV", "false")?;

        if config.snippets_per_page == 0 {
            return Err(format_err!("LASTWEEK_SNIPPETS_PER_PAGE must be at least 1"));
        }
        Ok(config)
    }
}

/// Decode a 32-byte key given as 64 hex characters.
pub fn parse_secret_key(hex_key: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_key.trim()).map_err(|e| format_err!("invalid SECRET_KEY hex: {}", e))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        format_err!(
            "SECRET_KEY must be 64 hex chars (32 bytes), got {} bytes",
            bytes.len()
        )
    })
}

fn optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            info!("{key} not set");
            None
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        format_err!("invalid {key} value {value:?}: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secret_key() {
        let key = parse_secret_key(&"ab".repeat(32)).unwrap();
        assert_eq!(key, [0xab; 32]);
    }

    #[test]
    fn test_parse_secret_key_rejects_bad_input() {
        assert!(parse_secret_key("not hex").is_err());
        assert!(parse_secret_key(&"ab".repeat(16)).is_err());
    }

    #[test]
    fn test_with_secret_defaults() {
        let config = Config::with_secret([1; 32]);
        assert_eq!(config.snippets_per_page, DEFAULT_SNIPPETS_PER_PAGE);
        assert_eq!(config.mail_sender.email.to_string(), "noreply@lastweek.local");
        assert!(config.redis_url.is_none());
    }
}
