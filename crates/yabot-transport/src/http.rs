//! HTTP transport for the Yandex Messenger Bot API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use yabot_core::{OutgoingText, Transport, TransportError, TransportResult};

/// Production endpoint of the Bot API.
pub const DEFAULT_BASE_URL: &str = "https://botapi.messenger.yandex.net/bot/v1";

/// Longest error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Settings for [`HttpTransport`].
#[derive(Clone)]
pub struct HttpTransportConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Bot token.
    pub token: String,
    /// Authorization scheme placed before the token.
    pub auth_scheme: String,
    /// Timeout for ordinary calls.
    pub request_timeout: Duration,
    /// Timeout for `getUpdates`.
    pub poll_timeout: Duration,
}

impl HttpTransportConfig {
    /// Creates a config for the production endpoint.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            auth_scheme: "OAuth".to_string(),
            request_timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = scheme.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("auth_scheme", &self.auth_scheme)
            .field("request_timeout", &self.request_timeout)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    updates: Vec<Value>,
}

#[derive(Deserialize)]
struct SendTextResponse {
    #[serde(default)]
    message_id: Option<i64>,
}

/// [`Transport`] over HTTPS with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl HttpTransport {
    /// Builds the HTTP client. Fails if the token cannot be used as a header.
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("{} {}", config.auth_scheme, config.token))
            .map_err(|e| TransportError::InvalidConfig(format!("authorization header: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_timeout: config.poll_timeout,
        })
    }

    /// The API root in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> TransportResult<T> {
        let status = response.status();
        // The Bot API answers 200 on success; any other code is a failure.
        if status != StatusCode::OK {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_updates(&self, offset: i64, limit: u32) -> TransportResult<Vec<Value>> {
        let url = format!(
            "{}/messages/getUpdates?offset={offset}&limit={limit}",
            self.base_url
        );
        trace!(offset, limit, "Polling for updates");

        let response = self
            .client
            .get(&url)
            .timeout(self.poll_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body: UpdatesResponse = Self::decode(response).await?;

        if !body.updates.is_empty() {
            debug!(count = body.updates.len(), offset, "Received updates");
        }
        Ok(body.updates)
    }

    async fn send_text(&self, message: &OutgoingText) -> TransportResult<Option<i64>> {
        let url = format!("{}/messages/sendText", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(message)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body: SendTextResponse = Self::decode(response).await?;
        Ok(body.message_id)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
