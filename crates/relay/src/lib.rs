#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod recent;
pub mod routes;
pub mod submission;
pub mod telegram;

pub use config::RelayConfig;
pub use error::{ConfigError, NotifyError, RelayError};
pub use routes::{MAX_BODY_BYTES, RelayState, routes};
pub use telegram::{BotApi, TelegramClient, TelegramConfig};
