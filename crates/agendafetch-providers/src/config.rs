//! Fetcher configuration.

use std::time::Duration;

use agendafetch_core::Credentials;

/// Settings shared by the conference fetcher and the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Keys used to sign outbound requests.
    pub credentials: Credentials,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::anonymous(),
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("agendafetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key pair. Empty strings leave requests unsigned.
    pub fn with_credentials(
        mut self,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.credentials = self
            .credentials
            .with_api_key(api_key)
            .with_secret_key(secret_key);
        self
    }

    /// Adds or omits the `timestamp` parameter on signed requests.
    pub fn with_timestamp(mut self, use_timestamp: bool) -> Self {
        self.credentials = self.credentials.with_timestamp(use_timestamp);
        self
    }

    /// Disables TLS verification (for testing only).
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FetcherConfig::default();
        assert!(!config.credentials.signs_requests());
        assert!(config.credentials.use_timestamp);
        assert!(config.verify_tls);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("agendafetch/"));
    }

    #[test]
    fn builder_methods() {
        let config = FetcherConfig::new()
            .with_credentials("key", "secret")
            .with_timestamp(false)
            .with_insecure_tls()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("DeepTalk/1.0");

        assert_eq!(config.credentials.api_key(), Some("key"));
        assert_eq!(config.credentials.secret_key(), Some("secret"));
        assert!(!config.credentials.use_timestamp);
        assert!(!config.verify_tls);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "DeepTalk/1.0");
    }
}
