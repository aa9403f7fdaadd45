//! The fetch capability the conference fetcher is built on.
//!
//! [`UrlFetcher`] turns a URL into the response body. The HTTP
//! implementation lives in [`crate::http`]; [`StaticFetcher`] serves canned
//! bodies for tests and offline use.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use tracing::trace;
use url::Url;

use crate::error::{AgendaError, AgendaResult};

/// A boxed future for async trait methods.
///
/// Keeps [`UrlFetcher`] object-safe so fetchers can be held as `dyn`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Retrieves the body behind a URL.
///
/// Implementations report transport problems (connection, status code,
/// unreadable body) as [`AgendaErrorCode::Fetch`](crate::AgendaErrorCode::Fetch).
pub trait UrlFetcher: Send + Sync {
    /// Short name used in logs, e.g. `"http"`.
    fn name(&self) -> &str;

    /// Fetches `url` and returns the response body as text.
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, AgendaResult<String>>;
}

/// Serves fixed bodies keyed by exact URL and records every request.
///
/// URLs without a body fail with a fetch error, as an unreachable host would.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UrlFetcher for StaticFetcher {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, AgendaResult<String>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        trace!(url = %url, "serving canned response");

        let result = self.responses.get(url.as_str()).cloned().ok_or_else(|| {
            AgendaError::fetch(format!("no response registered for {}", url))
                .with_site(url.host_str().unwrap_or_default())
        });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgendaErrorCode;

    #[tokio::test]
    async fn serves_registered_bodies() {
        let fetcher = StaticFetcher::new().with_response("https://example.org/a", "body");
        let url = Url::parse("https://example.org/a").unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "body");
        assert_eq!(fetcher.requests(), vec!["https://example.org/a"]);
    }

    #[tokio::test]
    async fn unknown_url_is_a_fetch_error() {
        let fetcher = StaticFetcher::new();
        let url = Url::parse("https://example.org/missing").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::Fetch);
        assert_eq!(err.site(), Some("example.org"));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[test]
    fn usable_as_trait_object() {
        let fetcher: Box<dyn UrlFetcher> = Box::new(StaticFetcher::new());
        assert_eq!(fetcher.name(), "static");
    }
}
