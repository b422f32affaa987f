// src/client.rs
//! REST client for the SOLIDserver API.
//!
//! Handles authentication headers, TLS verification and retries after
//! connection failures. Replies are classified into [`ApiReply`] before
//! they leave this module.

pub mod response;

pub use response::{ApiFailure, ApiReply, Record};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::config::constants;
use crate::config::ProviderConfig;
use crate::types::{IpamError, Result};
use crate::utils;

/// Query-style request parameters, in order
pub type Params = Vec<(String, String)>;

/// Build [`Params`] from string pairs
pub fn params<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Params {
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Verb + path + parameters in, classified reply out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn request(&self, method: Method, path: &str, params: Params) -> Result<ApiReply>;
}

/// SOLIDserver API client
#[derive(Debug, Clone)]
pub struct SolidServerClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl SolidServerClient {
    /// Create a new client from the provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(constants::USERNAME_HEADER, encoded_header(&config.username)?);
        headers.insert(constants::PASSWORD_HEADER, encoded_header(&config.password)?);

        if !config.ssl_verify {
            warn!("TLS certificate verification is disabled for {}", config.base_url());
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(constants::USER_AGENT)
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once(&self, method: &Method, url: &str, params: &Params) -> std::result::Result<(u16, String), reqwest::Error> {
        let response = self.client
            .request(method.clone(), url)
            .query(params)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

fn encoded_header(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&base64::encode(value))
        .map_err(|e| IpamError::Config(format!("invalid credential header: {}", e)))
}

/// Delay before retry number `attempt` (0-based)
fn retry_delay(attempt: u32) -> std::time::Duration {
    let backoff = constants::RETRY_BASE_DELAY * 2u32.saturating_pow(attempt.min(6));
    backoff + utils::random_jitter(std::time::Duration::from_millis(constants::RETRY_JITTER_MAX_MS))
}

#[async_trait]
impl RestTransport for SolidServerClient {
    async fn request(&self, method: Method, path: &str, params: Params) -> Result<ApiReply> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut attempt = 0;

        loop {
            debug!("{} {} ({} parameters)", method, url, params.len());

            match self.send_once(&method, &url, &params).await {
                Ok((status, body)) => {
                    debug!("{} {} -> HTTP {}", method, path, status);
                    return ApiReply::from_parts(status, &body);
                }
                // The request never reached the server, so it is safe to send again
                Err(e) if e.is_connect() && attempt < self.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!(
                        "Connection to {} failed ({}), retrying in {:?} ({}/{})",
                        self.base_url, e, delay, attempt + 1, self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(IpamError::Transport(e)),
            }
        }
    }
}
