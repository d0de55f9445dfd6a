use crate::PreviewError;
use reqwest::{header::HeaderMap, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

const DEFAULT_USER_AGENT: &str = "link-unfurl/0.3 (+https://indieweb.org/link_preview)";

/// Thin HTTP layer shared by every source: page HTML, oEmbed JSON and image bytes.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_custom_config(timeout: Duration, user_agent: &str) -> Self {
        Self::new_with_config(FetcherConfig {
            user_agent: user_agent.to_string(),
            timeout,
            ..Default::default()
        })
    }

    /// Creates a Fetcher with custom configuration
    pub fn new_with_config(config: FetcherConfig) -> Self {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(10);

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        if let Some(redirect_policy) = config.redirect_policy {
            client_builder = client_builder.redirect(redirect_policy);
        }

        let client = client_builder.build().unwrap_or_else(|e| {
            error!(error = %e, "Failed to create HTTP client");
            panic!("Failed to initialize HTTP client: {}", e);
        });

        Self { client }
    }

    async fn get(&self, url: &str) -> Result<Response, PreviewError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to send request");
            PreviewError::from_reqwest(e, url)
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "Request returned error status");
            return Err(PreviewError::from_status(status, url));
        }

        Ok(response)
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_html(&self, url: &str) -> Result<String, PreviewError> {
        let content = self.get(url).await?.text().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            PreviewError::from_reqwest(e, url)
        })?;

        debug!(url = %url, content_length = content.len(), "Successfully fetched webpage");
        Ok(content)
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, PreviewError> {
        let bytes = self.get(url).await?.bytes().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            PreviewError::from_reqwest(e, url)
        })?;

        debug!(url = %url, size = bytes.len(), "Successfully fetched bytes");
        Ok(bytes.to_vec())
    }

    /// GET `url` and decode the JSON body, blaming `service` for anything that goes wrong.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        service: &str,
    ) -> Result<T, PreviewError> {
        let response = self.get(url).await?;

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to parse JSON response");
            PreviewError::ExternalServiceError {
                service: service.to_string(),
                message: e.to_string(),
            }
        })
    }
}

/// Creates a fetcher with custom configurations.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-custom-agent/1.0".to_string(),
///     timeout: Duration::from_secs(20),
///     headers: Some(my_custom_headers),
///     redirect_policy: Some(reqwest::redirect::Policy::limited(5)),
/// });
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub redirect_policy: Option<reqwest::redirect::Policy>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            headers: None,
            redirect_policy: None,
        }
    }
}
