use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::common::{ApiQueryParams, SlackResponse};
use super::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Slack Web API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    debug: bool,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Log request URLs and raw response bodies
    pub debug: bool,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            debug: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientOptions {
    /// Defaults overlaid with `SLACK_API_URL` and `TF_LOG`
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(url) = std::env::var("SLACK_API_URL") {
            if !url.is_empty() {
                options.base_url = url;
            }
        }

        // Only the two most verbose Terraform levels turn on wire logging
        options.debug = std::env::var("TF_LOG")
            .map(|level| {
                level.eq_ignore_ascii_case("debug") || level.eq_ignore_ascii_case("trace")
            })
            .unwrap_or(false);

        options
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("token", &"***")
            .field("debug", &self.inner.debug)
            .finish()
    }
}

impl Client {
    /// Create a new API client
    pub fn new(token: &str, options: ClientOptions) -> Result<Self, ApiError> {
        let base_url = options.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("terraform-provider-slack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                token: token.to_string(),
                debug: options.debug,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Call a Web API method with GET and form-encoded query parameters
    pub async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let mut url = Url::parse(&format!("{}/{}", self.inner.base_url, method))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.as_pairs());
        }

        if self.inner.debug {
            tracing::debug!("GET request to: {}", url);
        }

        let response = self
            .inner
            .http_client
            .get(url)
            .bearer_auth(&self.inner.token)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if self.inner.debug {
            tracing::debug!(method, %status, "API response body: {}", text);
        }

        if !status.is_success() {
            tracing::error!(method, %status, "Slack API request failed");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        self.parse_response(method, &text)
    }

    fn parse_response<T: DeserializeOwned>(&self, method: &str, text: &str) -> Result<T, ApiError> {
        let envelope: SlackResponse = serde_json::from_str(text).map_err(|e| {
            tracing::error!("Failed to deserialize {} response: {}", method, e);
            ApiError::Parse(e.to_string())
        })?;

        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            tracing::debug!(method, code = %code, "Slack API returned an error");
            return Err(ApiError::Slack(code));
        }

        if let Some(warning) = envelope.warning {
            tracing::warn!(method, warning = %warning, "Slack API returned a warning");
        }

        serde_json::from_str(text).map_err(|e| {
            tracing::error!("Failed to deserialize {} response: {}", method, e);
            ApiError::Parse(e.to_string())
        })
    }
}
