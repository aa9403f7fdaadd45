//! HTTP transport backed by `reqwest`.

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::FetcherConfig;
use crate::error::{AgendaError, AgendaResult};
use crate::fetch::{BoxFuture, UrlFetcher};

/// Fetches agenda payloads over HTTP(S).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher using the timeout, TLS and user agent settings of `config`.
    pub fn new(config: &FetcherConfig) -> AgendaResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                AgendaError::fetch(format!("Failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> AgendaResult<String> {
        let site = url.host_str().unwrap_or_default();
        debug!(url = %url, "GET");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            AgendaError::fetch(format!("Request failed: {}", e))
                .with_site(site)
                .with_source(e)
        })?;

        handle_response(response)
            .await
            .map_err(|e| e.with_site(site))
    }
}

async fn handle_response(response: Response) -> AgendaResult<String> {
    let status = response.status();
    trace!(status = %status, "Received response");

    match status {
        s if s.is_success() => response.text().await.map_err(|e| {
            AgendaError::fetch(format!("Failed to read response: {}", e)).with_source(e)
        }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AgendaError::fetch(format!(
            "Access denied ({}); check the API key and secret",
            status
        ))),
        StatusCode::NOT_FOUND => Err(AgendaError::fetch("Agenda not found (404)")),
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, "Unexpected response status");
            Err(AgendaError::fetch(format!("Unexpected status {}: {}", s, body)))
        }
    }
}

impl UrlFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, AgendaResult<String>> {
        Box::pin(self.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn client_creation() {
        let config = FetcherConfig::new()
            .with_timeout(Duration::from_secs(10))
            .with_user_agent("agendafetch-test");
        let fetcher = HttpFetcher::new(&config).unwrap();
        assert_eq!(fetcher.name(), "http");
    }

    #[test]
    fn insecure_client_creation() {
        let config = FetcherConfig::new().with_insecure_tls();
        assert!(HttpFetcher::new(&config).is_ok());
    }
}
