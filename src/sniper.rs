//! # Sniper
//! The periodic work cycle: make sure sources are usable, gather candidates,
//! filter and rank them, then spend the bullets.

use chrono::Utc;
use metrics::counter;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{AltitudeRange, SniperMode, SniperSettings};
use crate::eligibility::EligibilityFilter;
use crate::engine::{SnipeEngine, SnipeOutcome};
use crate::error::SniperResult;
use crate::handled::HandledCache;
use crate::ingest::http::HttpJsonFetcher;
use crate::ingest::types::{LiveFeed, LocationHash, Target};
use crate::ingest::{from_feed, Aggregator};
use crate::ranking::Ranker;
use crate::species::SpeciesCatalog;
use crate::world::{CollectionIndex, DoNotDisturb, EncounterHandler, World};

/// Pause between two consecutive attempts within one cycle.
pub const ATTEMPT_PAUSE: Duration = Duration::from_secs(3);

/// Everything the sniper talks to but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub world: Arc<dyn World>,
    pub encounter: Arc<dyn EncounterHandler>,
    pub collection: Arc<dyn CollectionIndex>,
    pub catalog: Arc<dyn SpeciesCatalog>,
    pub http: Arc<dyn HttpJsonFetcher>,
    /// Required in social mode.
    pub feed: Option<Arc<dyn LiveFeed>>,
    pub handled: Arc<HandledCache>,
    pub dnd: DoNotDisturb,
}

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct WorkReport {
    pub candidates: usize,
    pub eligible: usize,
    pub attempts: Vec<(LocationHash, SnipeOutcome)>,
}

impl WorkReport {
    pub fn commits(&self) -> usize {
        self.attempts.iter().filter(|(_, o)| o.is_committed()).count()
    }
}

pub struct Sniper {
    mode: SniperMode,
    bullets: u32,
    homing_shots: bool,
    attempt_pause: Duration,
    aggregator: Aggregator,
    filter: EligibilityFilter,
    ranker: Ranker,
    engine: SnipeEngine,
    world: Arc<dyn World>,
    collection: Arc<dyn CollectionIndex>,
    catalog: Arc<dyn SpeciesCatalog>,
    feed: Option<Arc<dyn LiveFeed>>,
    handled: Arc<HandledCache>,
    debug: bool,
}

impl Sniper {
    pub fn new(settings: SniperSettings, env: Collaborators) -> Self {
        let altitude = draw_altitude(settings.altitude);
        trace_if!(settings.debug, altitude, "altitude for this run");

        let filter = EligibilityFilter::from_settings(&settings);
        let engine = SnipeEngine::new(
            env.world.clone(),
            env.encounter,
            env.handled.clone(),
            env.dnd,
            altitude,
        )
        .trust_identified(settings.mode == SniperMode::Social)
        .with_debug(settings.debug);
        let aggregator = Aggregator::new(settings.sources, env.http, env.catalog.clone())
            .with_debug(settings.debug);

        Self {
            mode: settings.mode,
            bullets: settings.bullets,
            homing_shots: settings.homing_shots,
            attempt_pause: ATTEMPT_PAUSE,
            aggregator,
            filter,
            ranker: Ranker::new(settings.order),
            engine,
            world: env.world,
            collection: env.collection,
            catalog: env.catalog,
            feed: env.feed,
            handled: env.handled,
            debug: settings.debug,
        }
    }

    pub fn with_attempt_pause(mut self, pause: Duration) -> Self {
        self.attempt_pause = pause;
        self
    }

    /// Replace the engine, e.g. to shorten its settle delay.
    pub fn map_engine(mut self, f: impl FnOnce(SnipeEngine) -> SnipeEngine) -> Self {
        self.engine = f(self.engine);
        self
    }

    pub fn map_aggregator(mut self, f: impl FnOnce(Aggregator) -> Aggregator) -> Self {
        self.aggregator = f(self.aggregator);
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn handled(&self) -> &HandledCache {
        &self.handled
    }

    pub fn altitude(&self) -> f64 {
        self.engine.altitude()
    }

    /// One cycle. Individual snipes never fail the cycle; an error here
    /// means validation hit something unexpected or the environment was busy.
    pub async fn work(&mut self) -> SniperResult<WorkReport> {
        if !self.ready().await? {
            return Ok(WorkReport::default());
        }

        let candidates = self.candidates().await;
        let now_ms = Utc::now().timestamp_millis();
        let total = candidates.len();
        let mut targets = self.filter.select(
            candidates,
            &self.handled,
            self.collection.as_ref(),
            self.catalog.as_ref(),
            now_ms,
        );
        self.ranker.rank(&mut targets);
        trace_if!(self.debug, candidates = total, eligible = targets.len(), "filtered targets");

        let mut report = WorkReport {
            candidates: total,
            eligible: targets.len(),
            attempts: Vec::new(),
        };
        self.fire(targets, &mut report).await?;
        Ok(report)
    }

    /// Re-checks eligibility first; a candidate that turned stale is skipped
    /// without touching the environment.
    pub async fn snipe(&mut self, target: &mut Target) -> SniperResult<SnipeOutcome> {
        let verdict =
            self.filter
                .evaluate(target, &self.handled, Utc::now().timestamp_millis());
        if !verdict.is_eligible() {
            return Ok(SnipeOutcome::Skipped(verdict));
        }
        counter!("sniper_shots_total").increment(1);
        self.engine.attempt(target).await
    }

    async fn ready(&mut self) -> SniperResult<bool> {
        if self.mode == SniperMode::Url {
            if self.aggregator.registry().has_pending() {
                self.aggregator.validate_pending().await?;
            }
            if self.aggregator.registry().is_exhausted() {
                warn!(target: "sniper", "no source available, skipping");
                return Ok(false);
            }
        }

        if let Some(resume_at) = self.world.catch_resume_at() {
            trace_if!(self.debug, %resume_at, "catching is paused, skipping");
            return Ok(false);
        }
        Ok(true)
    }

    async fn candidates(&mut self) -> Vec<Target> {
        match self.mode {
            SniperMode::Url => self.aggregator.poll().await,
            SniperMode::Social => match &self.feed {
                Some(feed) => from_feed(feed.as_ref(), self.catalog.as_ref()),
                None => {
                    warn!(target: "sniper", "social mode without a live feed");
                    Vec::new()
                }
            },
        }
    }

    async fn fire(&mut self, targets: Vec<Target>, report: &mut WorkReport) -> SniperResult<()> {
        let remaining = targets.len();
        let mut shots = 0u32;

        for (index, mut target) in targets.into_iter().enumerate() {
            if shots >= self.bullets {
                break;
            }

            let outcome = self.snipe(&mut target).await?;
            if matches!(outcome, SnipeOutcome::Skipped(_)) {
                trace_if!(self.debug, name = %target.species_name, ?outcome, "no longer eligible");
                continue;
            }
            report.attempts.push((target.location_hash(), outcome));

            shots += 1;
            if self.homing_shots && !outcome.is_committed() {
                shots -= 1;
            }

            if shots < self.bullets && index + 1 < remaining {
                info!(target: "sniper", "waiting a few seconds to teleport again to another target");
                tokio::time::sleep(self.attempt_pause).await;
            }
        }
        Ok(())
    }
}

fn draw_altitude(range: AltitudeRange) -> f64 {
    if range.max <= range.min {
        return range.min;
    }
    rand::rng().random_range(range.min..=range.max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn altitude_stays_in_range() {
        let range = AltitudeRange { min: 8.0, max: 12.0 };
        for _ in 0..50 {
            let a = draw_altitude(range);
            assert!((8.0..=12.0).contains(&a));
        }
        assert_eq!(draw_altitude(AltitudeRange { min: 9.0, max: 9.0 }), 9.0);
    }

    #[test]
    fn report_counts_commits() {
        let r = WorkReport {
            attempts: vec![
                (LocationHash::new(0.0, 0.0), SnipeOutcome::Committed),
                (
                    LocationHash::new(1.0, 0.0),
                    SnipeOutcome::Aborted(crate::engine::AbortReason::NotFound),
                ),
            ],
            ..Default::default()
        };
        assert_eq!(r.commits(), 1);
    }
}
