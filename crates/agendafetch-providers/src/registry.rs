//! Per-host knowledge learned while fetching.
//!
//! Remote installations migrate from the legacy `.py` endpoints to `/event/`
//! paths and later from the markup export to JSON. Once a fallback succeeds
//! for a host, the registry remembers it so later fetches go straight to the
//! dialect that works.

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use agendafetch_core::DEFAULT_SITE;

/// Hosts known to serve the modern path layout and the JSON export.
///
/// Additive apart from [`reset`](Self::reset) and [`clear`](Self::clear).
/// Share it between fetchers behind an `Arc`.
#[derive(Debug)]
pub struct SiteCapabilityRegistry {
    modern_format: RwLock<BTreeSet<String>>,
    json: RwLock<BTreeSet<String>>,
}

impl Default for SiteCapabilityRegistry {
    fn default() -> Self {
        Self {
            modern_format: RwLock::new(seeds()),
            json: RwLock::new(seeds()),
        }
    }
}

fn seeds() -> BTreeSet<String> {
    BTreeSet::from([DEFAULT_SITE.to_string()])
}

impl SiteCapabilityRegistry {
    /// A registry seeded with the hosts known to have migrated.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that knows nothing.
    pub fn empty() -> Self {
        Self {
            modern_format: RwLock::new(BTreeSet::new()),
            json: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn uses_modern_format(&self, site: &str) -> bool {
        contains(&self.modern_format, site)
    }

    pub fn uses_json(&self, site: &str) -> bool {
        contains(&self.json, site)
    }

    pub fn record_modern_format(&self, site: &str) {
        if insert(&self.modern_format, site) {
            debug!(site = %site, "learned host uses modern event paths");
        }
    }

    pub fn record_uses_json(&self, site: &str) {
        if insert(&self.json, site) {
            debug!(site = %site, "learned host uses JSON export");
        }
    }

    /// Restores the seeded state.
    pub fn reset(&self) {
        *write(&self.modern_format) = seeds();
        *write(&self.json) = seeds();
        debug!("site capability registry reset");
    }

    /// Forgets every host, seeds included.
    pub fn clear(&self) {
        write(&self.modern_format).clear();
        write(&self.json).clear();
        debug!("site capability registry cleared");
    }

    /// Hosts on the modern-format list, sorted.
    pub fn modern_format_hosts(&self) -> Vec<String> {
        snapshot(&self.modern_format)
    }

    /// Hosts on the JSON list, sorted.
    pub fn json_hosts(&self) -> Vec<String> {
        snapshot(&self.json)
    }
}

// A panic while holding the lock cannot leave a set half-updated, so a
// poisoned lock is still safe to use.
fn read(set: &RwLock<BTreeSet<String>>) -> std::sync::RwLockReadGuard<'_, BTreeSet<String>> {
    set.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(set: &RwLock<BTreeSet<String>>) -> std::sync::RwLockWriteGuard<'_, BTreeSet<String>> {
    set.write().unwrap_or_else(PoisonError::into_inner)
}

fn contains(set: &RwLock<BTreeSet<String>>, site: &str) -> bool {
    read(set).contains(&site.to_ascii_lowercase())
}

fn insert(set: &RwLock<BTreeSet<String>>, site: &str) -> bool {
    write(set).insert(site.to_ascii_lowercase())
}

fn snapshot(set: &RwLock<BTreeSet<String>>) -> Vec<String> {
    read(set).iter().cloned().collect()
}
