// src/ingest/validate.rs
//! Source lifecycle: pending → active, rejected, or still pending.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{SniperError, SniperResult};
use crate::ingest::fetch::SourceFetcher;
use crate::ingest::http::HttpJsonFetcher;
use crate::ingest::schema::SourceSchema;
use crate::species::SpeciesCatalog;

/// What happened to one pending source during a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Activated,
    /// Disabled in configuration; dropped without error.
    Disabled,
    /// Structural mapping error; dropped for good.
    Rejected(String),
    /// Transient failure; retried on a later cycle.
    StillPending(String),
}

/// Check every declared param against the first sample record.
/// Missing params are collected and reported together.
pub fn validate_sample(schema: &SourceSchema, sample: &[Value]) -> SniperResult<()> {
    let first = sample.first().ok_or(SniperError::EmptySample)?;
    let record = first.as_object();

    let missing: Vec<String> = schema
        .mappings
        .iter()
        .filter(|(_, m)| m.exists)
        .filter(|(_, m)| !record.is_some_and(|r| r.contains_key(&m.param)))
        .map(|(_, m)| m.param.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SniperError::Mapping(missing))
    }
}

impl SourceFetcher<'_> {
    /// Fetch one live sample and verify the mapping against it.
    pub async fn validate(&self) -> SniperResult<()> {
        let sample = self.fetch_raw().await?;
        validate_sample(self.schema(), &sample)
    }
}

/// Owns the pending and active source sets.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    pending: Vec<SourceSchema>,
    active: Vec<SourceSchema>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceSchema>) -> Self {
        Self {
            pending: sources,
            active: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[SourceSchema] {
        &self.pending
    }

    pub fn active(&self) -> &[SourceSchema] {
        &self.active
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Nothing active and nothing left to try.
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    /// Run one validation pass over the pending sources.
    ///
    /// Errors that are neither transient nor structural propagate; sources
    /// handled before the failure keep their new state.
    pub async fn validate_pending(
        &mut self,
        http: &dyn HttpJsonFetcher,
        catalog: &dyn SpeciesCatalog,
    ) -> SniperResult<Vec<(String, ValidationOutcome)>> {
        let mut report = Vec::with_capacity(self.pending.len());
        let mut still_pending = Vec::new();
        let mut queue = std::mem::take(&mut self.pending).into_iter();

        while let Some(schema) = queue.next() {
            let url = schema.url.clone();

            if !schema.enabled {
                info!(target: "sniper", source = %url, "source is disabled, ignoring");
                report.push((url, ValidationOutcome::Disabled));
                continue;
            }

            let result = SourceFetcher::new(&schema, http, catalog)
                .validate()
                .await;

            match result {
                Ok(()) => {
                    info!(target: "sniper", source = %url, "source is good, storing");
                    self.active.push(schema);
                    report.push((url, ValidationOutcome::Activated));
                }
                Err(e) if e.is_structural() => {
                    warn!(target: "sniper", source = %url, error = %e, "source contains errors, ignoring");
                    report.push((url, ValidationOutcome::Rejected(e.to_string())));
                }
                Err(e) if e.is_transient() => {
                    warn!(target: "sniper", source = %url, error = %e, "source could not be validated, still pending");
                    still_pending.push(schema);
                    report.push((url, ValidationOutcome::StillPending(e.to_string())));
                }
                Err(e) => {
                    still_pending.push(schema);
                    still_pending.extend(queue);
                    self.pending = still_pending;
                    return Err(e);
                }
            }
        }

        self.pending = still_pending;
        Ok(report)
    }
}
