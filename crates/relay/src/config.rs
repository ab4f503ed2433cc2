use std::env;
use std::net::{IpAddr, Ipv4Addr};

use url::Url;

use crate::error::ConfigError;
use crate::telegram::TelegramConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_RECENT_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Relay settings read from `RELAY_*`, `TELEGRAM_*` and `TEACHER_PASSWORD`.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub webhook_secret: Option<String>,
    /// Bearer token for the listing endpoint. Listing is refused when unset.
    pub teacher_password: Option<String>,
    /// How many submissions the in-memory log keeps.
    pub recent_limit: usize,
}

impl RelayConfig {
    /// Load `.env` if present, then read the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unparsable ports, limits or URLs.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unparsable ports, limits or URLs.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let port = match read("RELAY_PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidNumber {
                    key: "RELAY_PORT",
                    value,
                    source,
                })?,
            None => DEFAULT_PORT,
        };
        let recent_limit = match read("RELAY_RECENT_LIMIT") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|source| ConfigError::InvalidNumber {
                    key: "RELAY_RECENT_LIMIT",
                    value,
                    source,
                })?,
            None => DEFAULT_RECENT_LIMIT,
        };
        let api_base = read("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into());
        let api_base = Url::parse(&api_base).map_err(|source| ConfigError::InvalidUrl {
            key: "TELEGRAM_API_BASE",
            value: api_base.clone(),
            source,
        })?;

        Ok(Self {
            server: ServerConfig {
                host: read("RELAY_HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
                port,
            },
            telegram: TelegramConfig {
                bot_token: read("TELEGRAM_BOT_TOKEN"),
                chat_id: read("TELEGRAM_CHAT_ID"),
                api_base,
            },
            webhook_secret: read("TELEGRAM_WEBHOOK_SECRET"),
            teacher_password: read("TEACHER_PASSWORD"),
            recent_limit,
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> ([u8; 4], u16) {
        (parse_host_to_ipv4(&self.server.host).octets(), self.server.port)
    }
}

fn parse_host_to_ipv4(host: &str) -> Ipv4Addr {
    if let Ok(addr) = host.parse::<IpAddr>() {
        return match addr {
            IpAddr::V4(ipv4) => ipv4,
            IpAddr::V6(_) => {
                tracing::warn!(host, "IPv6 host is not supported, binding 0.0.0.0");
                Ipv4Addr::UNSPECIFIED
            }
        };
    }
    match host {
        "localhost" => Ipv4Addr::LOCALHOST,
        "" => Ipv4Addr::UNSPECIFIED,
        _ => {
            tracing::warn!(host, "unable to parse host as IPv4, binding 0.0.0.0");
            Ipv4Addr::UNSPECIFIED
        }
    }
}
