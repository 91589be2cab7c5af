use std::time::Duration;

use idgate_domain::constants::DEFAULT_HTTP_TIMEOUT_SECS;
use idgate_domain::{AuthError, HttpSettings};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::errors::TransportError;

/// OAuth error body returned by the token endpoint on failure.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
}

/// HTTP client with a bounded per-request timeout.
///
/// Calls are made exactly once; a timeout or non-2xx answer is returned to the
/// caller as a [`TransportError`].
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client configured from [`HttpSettings`].
    pub fn from_settings(settings: &HttpSettings) -> Result<Self, AuthError> {
        Self::builder().timeout(settings.request_timeout).build()
    }

    /// GET `url` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        let response = self.send(self.client.get(url)).await?;
        response.json::<T>().await.map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// POST a form-encoded body to `url` and decode a JSON body.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let response = self.send(self.client.post(url).form(form)).await?;
        response.json::<T>().await.map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, path = %url.path(), "sending HTTP request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(%method, path = %url.path(), error = %err, "HTTP request failed");
            TransportError::from(err)
        })?;

        let status = response.status();
        debug!(%method, path = %url.path(), %status, "received HTTP response");
        if status.is_success() {
            return Ok(response);
        }

        // The provider body is only mined for its OAuth error code.
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<OAuthErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown status").to_string());
        Err(TransportError::Status { status: status.as_u16(), detail })
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: Some(concat!("idgate/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, AuthError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|err| AuthError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}
