//! The things the binary can do, each rendering its result as JSON.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use agendafetch_core::{Location, parse_category};
use agendafetch_providers::{ConferenceFetcher, Normalizer};

use crate::cli::OutputMode;
use crate::error::CliResult;

fn render<T: Serialize>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Fetches every agenda reference, concurrently, and renders them in input order.
pub async fn fetch(
    fetcher: &ConferenceFetcher,
    agendas: &[String],
    mode: OutputMode,
) -> CliResult<Vec<String>> {
    let locations = agendas
        .iter()
        .map(|a| a.parse::<Location>())
        .collect::<Result<Vec<_>, _>>()?;

    let handles: Vec<_> = locations
        .into_iter()
        .map(|location| {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetch_one(&fetcher, &location, mode).await })
        })
        .collect();

    let mut rendered = Vec::with_capacity(handles.len());
    for handle in handles {
        let output = handle
            .await
            .map_err(|e| std::io::Error::other(format!("fetch task failed: {}", e)))??;
        rendered.push(output);
    }
    Ok(rendered)
}

async fn fetch_one(
    fetcher: &ConferenceFetcher,
    location: &Location,
    mode: OutputMode,
) -> CliResult<String> {
    debug!(location = %location, ?mode, "fetching");
    match mode {
        OutputMode::Normalized => render(&fetcher.fetch_meeting(location).await?),
        OutputMode::RawMarkup => render(&fetcher.fetch_raw_markup(location).await?),
        OutputMode::RawJson => render(&fetcher.fetch_raw_json(location).await?),
    }
}

/// Lists a category's conferences over the last `days_back` days.
pub async fn category(
    fetcher: &ConferenceFetcher,
    url: &str,
    days_back: i64,
) -> CliResult<String> {
    let category = parse_category(url)?;
    render(&fetcher.fetch_category(&category, days_back).await?)
}

/// Normalizes a saved export read from `path`.
pub async fn normalize_file(path: &Path, site: &str) -> CliResult<String> {
    let text = tokio::fs::read_to_string(path).await?;
    let normalizer = Normalizer::new().with_missing_material_callback(|err| {
        warn!("{}", err.message());
    });
    render(&normalizer.normalize_export(&text, site)?)
}
