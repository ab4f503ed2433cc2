
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use exam_core::model::SubmissionRecord;

use crate::error::DeliveryError;


/// Where the relay service lives.
#[derive(Clone, Debug)]
pub struct RelayEndpoint {
    submit_url: Url,
}

impl RelayEndpoint {
    /// Build from a base URL such as `https://relay.example.org`.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base` is not an absolute URL.
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            submit_url: base.join("api/submit")?,
        })
    }

    #[must_use]
    pub fn submit_url(&self) -> &Url {
        &self.submit_url
    }
}

/// The relay's acknowledgement of a delivered submission.
///
/// Every field defaults: any 2xx counts as delivered even if the body is odd.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub telegram_sent: bool,
    #[serde(default)]
    pub submission_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One delivery attempt of a record to the relay.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns `DeliveryError` on network failure or a non-2xx response.
    async fn deliver(&self, record: &SubmissionRecord) -> Result<SubmissionAck, DeliveryError>;
}

/// Posts records as JSON to the relay's submit endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: RelayEndpoint,
}

impl HttpTransport {
    #[must_use]
    pub fn new(endpoint: RelayEndpoint) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    async fn deliver(&self, record: &SubmissionRecord) -> Result<SubmissionAck, DeliveryError> {
        let response = self
            .client
            .post(self.endpoint.submit_url().clone())
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus(status));
        }

        let body = response.bytes().await?;
        let ack = serde_json::from_slice(&body).unwrap_or_else(|err| {
            tracing::warn!(%status, error = %err, "relay accepted submission with unreadable body");
            SubmissionAck {
                success: true,
                ..SubmissionAck::default()
            }
        });
        Ok(ack)
    }
}
