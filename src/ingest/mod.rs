// src/ingest/mod.rs
pub mod fetch;
pub mod http;
pub mod schema;
pub mod types;
pub mod validate;

use metrics::{counter, gauge};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::SniperResult;
use crate::ingest::fetch::SourceFetcher;
use crate::ingest::http::HttpJsonFetcher;
use crate::ingest::schema::SourceSchema;
use crate::ingest::types::{LiveFeed, Target};
use crate::ingest::validate::{SourceRegistry, ValidationOutcome};
use crate::metrics::ensure_metrics_described;
use crate::species::SpeciesCatalog;
use crate::throttle::Throttle;

/// Sources are not polled more often than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Fill in whichever of species name / id is missing from the other.
pub fn repair_species(t: &mut Target, catalog: &dyn SpeciesCatalog) {
    if t.species_name.is_empty() && t.species_id != 0 {
        t.species_name = catalog.name_for(t.species_id).unwrap_or_default();
    } else if t.species_id == 0 && !t.species_name.is_empty() {
        t.species_id = catalog.id_for(&t.species_name).unwrap_or(0);
    }
}

/// Merge per-source batches, keeping the first target seen per location.
/// Returns (merged, dropped_count).
pub fn merge_by_location<I>(batches: I) -> (Vec<Target>, usize)
where
    I: IntoIterator<Item = Vec<Target>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    let mut dropped = 0usize;

    for batch in batches {
        for t in batch {
            if seen.insert(t.location_hash()) {
                merged.push(t);
            } else {
                dropped += 1;
            }
        }
    }
    (merged, dropped)
}

/// Candidates from the live feed, with species identity repaired.
pub fn from_feed(feed: &dyn LiveFeed, catalog: &dyn SpeciesCatalog) -> Vec<Target> {
    let mut out = feed.snapshot();
    for t in out.iter_mut() {
        t.species_name = crate::species::normalize_species_name(&t.species_name);
        repair_species(t, catalog);
    }
    out
}

/// Fan-in over every active source, gated by [`MIN_POLL_INTERVAL`].
pub struct Aggregator {
    registry: SourceRegistry,
    throttle: Throttle,
    http: Arc<dyn HttpJsonFetcher>,
    catalog: Arc<dyn SpeciesCatalog>,
    debug: bool,
}

impl Aggregator {
    pub fn new(
        sources: Vec<SourceSchema>,
        http: Arc<dyn HttpJsonFetcher>,
        catalog: Arc<dyn SpeciesCatalog>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            registry: SourceRegistry::new(sources),
            throttle: Throttle::new(MIN_POLL_INTERVAL),
            http,
            catalog,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.throttle = Throttle::new(interval);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub async fn validate_pending(&mut self) -> SniperResult<Vec<(String, ValidationOutcome)>> {
        let urls: Vec<&str> = self.registry.pending().iter().map(|s| s.url.as_str()).collect();
        tracing::info!(target: "sniper", sources = ?urls, "validating sources");
        self.registry
            .validate_pending(self.http.as_ref(), self.catalog.as_ref())
            .await
    }

    /// One polling round. Empty when called again before the interval
    /// elapsed; a failing source only loses its own contribution.
    pub async fn poll(&mut self) -> Vec<Target> {
        if !self.throttle.try_acquire() {
            trace_if!(self.debug, "not ready yet to retrieve data");
            return Vec::new();
        }

        trace_if!(self.debug, "fetching targets from the sources");
        let mut batches = Vec::with_capacity(self.registry.active().len());
        for schema in self.registry.active() {
            let fetcher = SourceFetcher::new(schema, self.http.as_ref(), self.catalog.as_ref());
            match fetcher.fetch().await {
                Ok(v) => {
                    trace_if!(self.debug, source = %schema, results = v.len(), "source returned results");
                    batches.push(v);
                }
                Err(e) => {
                    warn!(target: "sniper", source = %schema, error = %e, "could not fetch data, skipping");
                    counter!("sniper_source_errors_total").increment(1);
                }
            }
        }

        let (merged, dropped) = merge_by_location(batches);
        trace_if!(self.debug, merged = merged.len(), dropped, "merged source results");

        counter!("sniper_candidates_total").increment(merged.len() as u64);
        counter!("sniper_dedup_total").increment(dropped as u64);
        gauge!("sniper_last_poll_ts").set(chrono::Utc::now().timestamp() as f64);
        merged
    }
}
