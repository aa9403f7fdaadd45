//! Conference fetching with dialect fallback.
//!
//! A fetch picks the dialect the registry says the host serves, tries it,
//! and falls back along the chain legacy → modern → JSON, each dialect at
//! most once:
//!
//! ```text
//! JSON host ───────────────────────────────────────► JSON ──► Meeting
//! other host ──► markup (legacy or modern)
//!                  ├─ parses ──────────────────────────────► Meeting
//!                  ├─ retired ──► JSON ────────────────────► Meeting (JSON learned)
//!                  └─ unparsable, legacy ──► modern (modern learned)
//!                                              ├─ parses ──► Meeting
//!                                              └─ retired ─► JSON ──► Meeting (JSON learned)
//! ```
//!
//! Anything else, including a failure of a fallback attempt, is returned
//! to the caller unchanged.

use std::sync::Arc;

use tracing::{debug, info};

use agendafetch_core::{Credentials, Dialect, Location, Meeting, build_category_url};

use crate::category::{AgendaSummary, parse_category_feed};
use crate::error::{AgendaError, AgendaResult};
use crate::fetch::UrlFetcher;
use crate::normalize::Normalizer;
use crate::raw::{Conference, Event, parse_json, parse_markup};
use crate::registry::SiteCapabilityRegistry;

/// Outcome of one attempt in a single dialect.
#[derive(Debug)]
enum Attempt<T> {
    Success(T),
    RetryWith(Dialect),
    Fatal(AgendaError),
}

/// A parsed payload in whichever dialect answered.
#[derive(Debug)]
enum Payload {
    Markup(Conference),
    Json(Event),
}

/// Fetches and normalizes conference agendas.
#[derive(Clone)]
pub struct ConferenceFetcher {
    fetcher: Arc<dyn UrlFetcher>,
    registry: Arc<SiteCapabilityRegistry>,
    credentials: Credentials,
    normalizer: Normalizer,
}

impl ConferenceFetcher {
    /// Creates an anonymous fetcher over `fetcher`, learning into `registry`.
    pub fn new(fetcher: Arc<dyn UrlFetcher>, registry: Arc<SiteCapabilityRegistry>) -> Self {
        Self {
            fetcher,
            registry,
            credentials: Credentials::anonymous(),
            normalizer: Normalizer::new(),
        }
    }

    /// Creates a fetcher over HTTP using `config` for transport and signing.
    #[cfg(feature = "http")]
    pub fn from_config(
        config: &crate::FetcherConfig,
        registry: Arc<SiteCapabilityRegistry>,
    ) -> AgendaResult<Self> {
        let http = crate::http::HttpFetcher::new(config)?;
        Ok(Self::new(Arc::new(http), registry).with_credentials(config.credentials.clone()))
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn registry(&self) -> &SiteCapabilityRegistry {
        &self.registry
    }

    /// Fetches the agenda at `location` and normalizes it.
    pub async fn fetch_meeting(&self, location: &Location) -> AgendaResult<Meeting> {
        let site = location.site.as_str();
        let meeting = match self.fetch_payload(location, true).await? {
            Payload::Markup(conf) => self.normalizer.normalize_markup(&conf, site),
            Payload::Json(event) => self.normalizer.normalize_json(&event, site),
        };
        meeting.map_err(|e| e.with_site(site))
    }

    /// Fetches the markup export of `location` without normalizing it.
    ///
    /// Falls back from the legacy to the modern path like [`fetch_meeting`](Self::fetch_meeting),
    /// but a retired export is returned as
    /// [`AgendaErrorCode::FormatDeprecated`](crate::AgendaErrorCode::FormatDeprecated).
    pub async fn fetch_raw_markup(&self, location: &Location) -> AgendaResult<Conference> {
        match self.fetch_payload(location, false).await? {
            Payload::Markup(conf) => Ok(conf),
            Payload::Json(_) => Err(AgendaError::format_deprecated("markup export is deprecated")
                .with_site(&location.site)),
        }
    }

    /// Fetches the JSON export of `location` without normalizing it.
    pub async fn fetch_raw_json(&self, location: &Location) -> AgendaResult<Event> {
        match self.attempt(location, Dialect::Json).await {
            Attempt::Success(Payload::Json(event)) => Ok(event),
            Attempt::Fatal(e) => Err(e),
            _ => Err(AgendaError::malformed_response("expected a JSON export").with_site(&location.site)),
        }
    }

    /// Lists the conferences of a category over the last `days_back` days.
    pub async fn fetch_category(
        &self,
        category: &Location,
        days_back: i64,
    ) -> AgendaResult<Vec<AgendaSummary>> {
        let url = build_category_url(category, days_back, &self.credentials)?;
        let body = self.fetcher.fetch(&url).await?;
        let summaries = parse_category_feed(&body).map_err(|e| e.with_site(&category.site))?;
        debug!(category = %category, count = summaries.len(), "category listed");
        Ok(summaries)
    }

    fn first_dialect(&self, site: &str, json_allowed: bool) -> Dialect {
        if json_allowed && self.registry.uses_json(site) {
            Dialect::Json
        } else {
            Dialect::markup(self.registry.uses_modern_format(site))
        }
    }

    async fn fetch_payload(&self, location: &Location, json_allowed: bool) -> AgendaResult<Payload> {
        let site = location.site.as_str();
        let first = self.first_dialect(site, json_allowed);
        debug!(location = %location, dialect = %first, "fetching agenda");

        let mut dialect = first;
        let mut tried = Vec::with_capacity(3);
        loop {
            let outcome = self.attempt(location, dialect).await;
            if dialect != first {
                self.learn(site, dialect, &outcome);
            }
            tried.push(dialect);

            let next = match outcome {
                Attempt::Success(payload) => return Ok(payload),
                Attempt::Fatal(e) => return Err(e),
                Attempt::RetryWith(Dialect::Json) if !json_allowed => {
                    return Err(AgendaError::format_deprecated("markup export is deprecated").with_site(site));
                }
                Attempt::RetryWith(next) if tried.contains(&next) => {
                    return Err(AgendaError::format_deprecated(format!(
                        "{} export is deprecated and the {} fallback was exhausted",
                        dialect, next
                    ))
                    .with_site(site));
                }
                Attempt::RetryWith(next) => next,
            };
            info!(site = %site, from = %dialect, to = %next, "retrying in another dialect");
            dialect = next;
        }
    }

    /// Records what a fallback attempt revealed about the host.
    ///
    /// A modern markup answer counts even when it only says the export is
    /// retired: the host did understand the modern path.
    fn learn(&self, site: &str, dialect: Dialect, outcome: &Attempt<Payload>) {
        match (dialect, outcome) {
            (Dialect::ModernMarkup, Attempt::Success(_) | Attempt::RetryWith(_)) => {
                self.registry.record_modern_format(site)
            }
            (Dialect::Json, Attempt::Success(_)) => self.registry.record_uses_json(site),
            _ => {}
        }
    }

    async fn attempt(&self, location: &Location, dialect: Dialect) -> Attempt<Payload> {
        let site = location.site.as_str();
        let url = match dialect.request_url(location, &self.credentials) {
            Ok(url) => url,
            Err(e) => return Attempt::Fatal(AgendaError::from(e).with_site(site)),
        };
        let body = match self.fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(e) => return Attempt::Fatal(e.with_site(site)),
        };

        match dialect {
            Dialect::Json => match parse_json(&body) {
                Ok(event) => Attempt::Success(Payload::Json(event)),
                Err(e) => Attempt::Fatal(e.with_site(site)),
            },
            Dialect::LegacyMarkup | Dialect::ModernMarkup => match parse_markup(&body) {
                Ok(conf) if conf.is_deprecated() => {
                    debug!(site = %site, "markup export is deprecated");
                    Attempt::RetryWith(Dialect::Json)
                }
                Ok(conf) => Attempt::Success(Payload::Markup(conf)),
                Err(e) if dialect == Dialect::LegacyMarkup => {
                    debug!(site = %site, error = %e, "legacy markup unusable");
                    Attempt::RetryWith(Dialect::ModernMarkup)
                }
                Err(e) => Attempt::Fatal(e.with_site(site)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgendaErrorCode;
    use crate::fetch::StaticFetcher;

    const GOOD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<iconf>
  <ID>a12345</ID>
  <title>hi there</title>
  <startDate>2024-05-02T09:00:00</startDate>
  <endDate>2024-05-02T10:00:00</endDate>
</iconf>"#;

    const RETIRED_XML: &str = r#"<?xml version="1.0"?><iconf><ID>a12345</ID><_deprecated>True</_deprecated></iconf>"#;

    const GOOD_JSON: &str = r#"{"count": 1, "results": [{"id": "a12345", "title": "from json"}]}"#;

    fn url(dialect: Dialect, location: &Location) -> String {
        dialect
            .request_url(location, &Credentials::anonymous())
            .unwrap()
            .to_string()
    }

    fn fetcher_with(
        stub: StaticFetcher,
        registry: SiteCapabilityRegistry,
    ) -> (ConferenceFetcher, Arc<StaticFetcher>) {
        let stub = Arc::new(stub);
        let fetcher = ConferenceFetcher::new(stub.clone(), Arc::new(registry));
        (fetcher, stub)
    }

    #[tokio::test]
    async fn modern_fallback_is_learned() {
        let location = Location::from_id(12345);
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::LegacyMarkup, &location), "<html>oops</html>")
            .with_response(url(Dialect::ModernMarkup, &location), GOOD_XML);
        let (fetcher, stub) = fetcher_with(stub, SiteCapabilityRegistry::empty());

        let meeting = fetcher.fetch_meeting(&location).await.unwrap();
        assert_eq!(meeting.title, "hi there");
        assert_eq!(meeting.site, "indico.cern.ch");
        assert_eq!(fetcher.registry().modern_format_hosts(), vec!["indico.cern.ch"]);
        assert!(fetcher.registry().json_hosts().is_empty());
        assert_eq!(stub.requests().len(), 2);

        // Second fetch goes straight to the modern path.
        fetcher.fetch_meeting(&location).await.unwrap();
        assert_eq!(stub.requests()[2], url(Dialect::ModernMarkup, &location));
    }

    #[tokio::test]
    async fn retired_markup_falls_back_to_json() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::LegacyMarkup, &location), RETIRED_XML)
            .with_response(url(Dialect::Json, &location), GOOD_JSON);
        let (fetcher, _) = fetcher_with(stub, SiteCapabilityRegistry::empty());

        let meeting = fetcher.fetch_meeting(&location).await.unwrap();
        assert_eq!(meeting.title, "from json");
        assert_eq!(fetcher.registry().json_hosts(), vec!["indico.example.org"]);
        assert!(fetcher.registry().modern_format_hosts().is_empty());
    }

    #[tokio::test]
    async fn unparsable_legacy_then_retired_modern_reaches_json() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::LegacyMarkup, &location), "<html>oops</html>")
            .with_response(url(Dialect::ModernMarkup, &location), RETIRED_XML)
            .with_response(url(Dialect::Json, &location), GOOD_JSON);
        let (fetcher, stub) = fetcher_with(stub, SiteCapabilityRegistry::empty());

        let meeting = fetcher.fetch_meeting(&location).await.unwrap();
        assert_eq!(meeting.title, "from json");
        assert_eq!(
            stub.requests(),
            vec![
                url(Dialect::LegacyMarkup, &location),
                url(Dialect::ModernMarkup, &location),
                url(Dialect::Json, &location),
            ]
        );
        assert_eq!(fetcher.registry().modern_format_hosts(), vec!["indico.example.org"]);
        assert_eq!(fetcher.registry().json_hosts(), vec!["indico.example.org"]);
    }

    #[tokio::test]
    async fn retired_modern_markup_falls_back_to_json() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let registry = SiteCapabilityRegistry::empty();
        registry.record_modern_format("indico.example.org");
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::ModernMarkup, &location), RETIRED_XML)
            .with_response(url(Dialect::Json, &location), GOOD_JSON);
        let (fetcher, stub) = fetcher_with(stub, registry);

        let meeting = fetcher.fetch_meeting(&location).await.unwrap();
        assert_eq!(meeting.title, "from json");
        assert_eq!(stub.requests().len(), 2);
        assert_eq!(fetcher.registry().json_hosts(), vec!["indico.example.org"]);

        // Once learned, JSON is asked for first.
        fetcher.fetch_meeting(&location).await.unwrap();
        assert_eq!(stub.requests()[2], url(Dialect::Json, &location));
    }

    #[tokio::test]
    async fn raw_markup_after_modern_fallback_reports_retired_export() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::LegacyMarkup, &location), "<html>oops</html>")
            .with_response(url(Dialect::ModernMarkup, &location), RETIRED_XML);
        let (fetcher, stub) = fetcher_with(stub, SiteCapabilityRegistry::empty());

        let err = fetcher.fetch_raw_markup(&location).await.unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::FormatDeprecated);
        assert_eq!(stub.requests().len(), 2);
        assert!(fetcher.registry().json_hosts().is_empty());
    }

    #[tokio::test]
    async fn json_hosts_skip_markup() {
        let location = Location::from_id(12345);
        let stub = StaticFetcher::new().with_response(url(Dialect::Json, &location), GOOD_JSON);
        let (fetcher, stub) = fetcher_with(stub, SiteCapabilityRegistry::new());

        let meeting = fetcher.fetch_meeting(&location).await.unwrap();
        assert_eq!(meeting.id, "a12345");
        assert_eq!(stub.requests(), vec![url(Dialect::Json, &location)]);
    }

    #[tokio::test]
    async fn modern_host_parse_failure_is_fatal() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let registry = SiteCapabilityRegistry::empty();
        registry.record_modern_format("indico.example.org");
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::ModernMarkup, &location), "<html>oops</html>");
        let (fetcher, stub) = fetcher_with(stub, registry);

        let err = fetcher.fetch_meeting(&location).await.unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::MalformedResponse);
        assert_eq!(err.site(), Some("indico.example.org"));
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn failed_fallback_surfaces_its_error() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::LegacyMarkup, &location), "<html>oops</html>");
        let (fetcher, _) = fetcher_with(stub, SiteCapabilityRegistry::empty());

        let err = fetcher.fetch_meeting(&location).await.unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::Fetch);
        assert!(fetcher.registry().modern_format_hosts().is_empty());
    }

    #[tokio::test]
    async fn transport_errors_are_not_retried() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let (fetcher, stub) = fetcher_with(StaticFetcher::new(), SiteCapabilityRegistry::empty());

        let err = fetcher.fetch_meeting(&location).await.unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::Fetch);
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn raw_markup_reports_retired_export() {
        let location = Location::from_id(12345).with_site("indico.example.org");
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::LegacyMarkup, &location), RETIRED_XML);
        let (fetcher, _) = fetcher_with(stub, SiteCapabilityRegistry::empty());

        let err = fetcher.fetch_raw_markup(&location).await.unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::FormatDeprecated);
        assert!(fetcher.registry().json_hosts().is_empty());
    }

    #[tokio::test]
    async fn raw_markup_ignores_json_list() {
        let location = Location::from_id(12345);
        let stub = StaticFetcher::new()
            .with_response(url(Dialect::ModernMarkup, &location), GOOD_XML);
        let (fetcher, _) = fetcher_with(stub, SiteCapabilityRegistry::new());

        let conf = fetcher.fetch_raw_markup(&location).await.unwrap();
        assert_eq!(conf.title, "hi there");
    }

    #[tokio::test]
    async fn raw_json() {
        let location = Location::from_id(12345);
        let stub = StaticFetcher::new().with_response(url(Dialect::Json, &location), GOOD_JSON);
        let (fetcher, _) = fetcher_with(stub, SiteCapabilityRegistry::empty());

        let event = fetcher.fetch_raw_json(&location).await.unwrap();
        assert_eq!(event.title, "from json");
    }

    #[tokio::test]
    async fn category_listing() {
        let category = Location::new("indico.cern.ch", "", "6725");
        let feed = "BEGIN:VCALENDAR\r\n\
                    VERSION:2.0\r\n\
                    BEGIN:VEVENT\r\n\
                    UID:e1\r\n\
                    DTSTART:20240502T070000Z\r\n\
                    SUMMARY:hi there\r\n\
                    URL:https://indico.cern.ch/event/1234/\r\n\
                    END:VEVENT\r\n\
                    END:VCALENDAR";
        let feed_url = build_category_url(&category, 7, &Credentials::anonymous()).unwrap();
        let stub = StaticFetcher::new().with_response(feed_url.to_string(), feed);
        let (fetcher, _) = fetcher_with(stub, SiteCapabilityRegistry::new());

        let summaries = fetcher.fetch_category(&category, 7).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "hi there");
        assert_eq!(summaries[0].location.identifier, "1234");
    }

    #[tokio::test]
    async fn negative_day_count_is_invalid() {
        let category = Location::new("indico.cern.ch", "", "6725");
        let (fetcher, stub) = fetcher_with(StaticFetcher::new(), SiteCapabilityRegistry::new());

        let err = fetcher.fetch_category(&category, -1).await.unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::InvalidParameter);
        assert!(stub.requests().is_empty());
    }
}
