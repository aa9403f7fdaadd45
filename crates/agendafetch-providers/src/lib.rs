//! Agenda fetching and normalization.
//!
//! - [`UrlFetcher`] - The fetch capability; [`http::HttpFetcher`] over the network
//! - [`raw`] - Wire-level trees for the markup and JSON exports
//! - [`Normalizer`] - Raw trees to the canonical [`Meeting`](agendafetch_core::Meeting)
//! - [`ConferenceFetcher`] - Dialect selection and fallback, category listings
//! - [`SiteCapabilityRegistry`] - What each host is known to serve
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐
//! │  Location  │──►│  UrlFetcher  │
//! └────────────┘   └──────┬───────┘
//!                         │ body
//!                         ▼
//!            ┌───────────────────────┐
//!            │ raw::markup / raw::json│
//!            └───────────┬───────────┘
//!                        ▼ Normalizer
//!                  ┌──────────┐
//!                  │ Meeting  │
//!                  └──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use agendafetch_core::Location;
//! use agendafetch_providers::{ConferenceFetcher, FetcherConfig, SiteCapabilityRegistry};
//!
//! let fetcher = ConferenceFetcher::from_config(
//!     &FetcherConfig::new(),
//!     Arc::new(SiteCapabilityRegistry::new()),
//! )?;
//! let meeting = fetcher.fetch_meeting(&"https://indico.cern.ch/event/1234/".parse()?).await?;
//! ```

pub mod category;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fetcher;
#[cfg(feature = "http")]
pub mod http;
pub mod normalize;
pub mod raw;
pub mod registry;

pub use category::{AgendaSummary, parse_category_feed};
pub use config::FetcherConfig;
pub use error::{AgendaError, AgendaErrorCode, AgendaResult};
pub use fetch::{BoxFuture, StaticFetcher, UrlFetcher};
pub use fetcher::ConferenceFetcher;
pub use normalize::{MissingMaterialCallback, Normalizer, find_best_material, sanitize};
pub use registry::SiteCapabilityRegistry;
