use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::NotifyError;

/// Bot credentials and API location.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: Url,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

/// The two bot API calls the relay makes.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Send an HTML-formatted message. Returns the new message id.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` when the bot is unconfigured or the call fails.
    async fn send_message(&self, chat_id: &str, html: &str) -> Result<i64, NotifyError>;

    /// Acknowledge an inline-button press so the client stops spinning.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` when the bot is unconfigured or the call fails.
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// `BotApi` over the Telegram HTTP API.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: Url,
    bot_token: Option<String>,
}

impl TelegramClient {
    #[must_use]
    pub fn new(config: &TelegramConfig) -> Self {
        let mut api_base = config.api_base.clone();
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        Self {
            client: Client::new(),
            api_base,
            bot_token: config.bot_token.clone(),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some()
    }

    fn method_url(&self, method: &str) -> Result<Url, NotifyError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or(NotifyError::NotConfigured("TELEGRAM_BOT_TOKEN"))?;
        // Tokens contain ':', so the segment must not parse as a scheme.
        Ok(self.api_base.join(&format!("./bot{token}/{method}"))?)
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<Option<T>, NotifyError>
    where
        B: Serialize + Sync,
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.method_url(method)?)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let parsed: ApiResponse<T> = response.json().await?;
        if !status.is_success() || !parsed.ok {
            return Err(NotifyError::Rejected {
                method,
                description: parsed
                    .description
                    .unwrap_or_else(|| format!("status {status}")),
            });
        }
        Ok(parsed.result)
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn send_message(&self, chat_id: &str, html: &str) -> Result<i64, NotifyError> {
        let body = SendMessage {
            chat_id,
            text: html,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let sent: Option<SentMessage> = self.call("sendMessage", &body).await?;
        Ok(sent.map_or(0, |message| message.message_id))
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), NotifyError> {
        let body = AnswerCallbackQuery { callback_query_id };
        let _: Option<bool> = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>, base: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_owned),
            chat_id: Some("42".into()),
            api_base: Url::parse(base).unwrap(),
        }
    }

    #[test]
    fn method_url_embeds_token() {
        let client = TelegramClient::new(&config(Some("123:abc"), "https://api.telegram.org"));
        assert_eq!(
            client.method_url("sendMessage").unwrap().as_str(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn method_url_keeps_base_path() {
        let client = TelegramClient::new(&config(Some("1:x"), "http://127.0.0.1:9000/mock"));
        assert_eq!(
            client.method_url("answerCallbackQuery").unwrap().as_str(),
            "http://127.0.0.1:9000/mock/bot1:x/answerCallbackQuery"
        );
    }

    #[tokio::test]
    async fn missing_token_is_not_configured() {
        let client = TelegramClient::new(&config(None, "https://api.telegram.org"));
        assert!(!client.is_configured());
        let err = client.send_message("42", "hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", config(Some("secret-token"), "https://api.telegram.org"));
        assert!(!rendered.contains("secret-token"));
    }
}
