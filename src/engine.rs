//! # Snipe Engine
//! Relocate to a candidate, confirm it against the live environment when
//! its identifiers are not trusted, act on it if confirmed, and always
//! return to where we started.
//!
//! `Idle → Relocated → {Verifying → Verified | Unverified} → Committed | Aborted → Recorded (Idle)`
//!
//! The do-not-disturb guard is held from before the first relocation until
//! after the candidate is recorded as handled, on every exit path.

use anyhow::anyhow;
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::eligibility::Eligibility;
use crate::error::SniperResult;
use crate::handled::HandledCache;
use crate::ingest::types::Target;
use crate::throttle::Throttle;
use crate::world::{DoNotDisturb, EncounterHandler, Position, World};

/// Environment queries are not issued more often than this.
pub const MIN_CELL_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Pause after every relocation so the environment catches up.
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnipeState {
    Idle,
    Relocated,
    Verifying,
    Verified,
    Unverified,
    Committed,
    Aborted,
}

/// Soft failure. From the outside "too far", "already gone", "expired" and
/// "fabricated" all look like [`AbortReason::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    NotFound,
    QueryFailed,
    RelocationFailed,
    ActionFailed,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbortReason::NotFound => "not here (too far, caught, expired or fake data)",
            AbortReason::QueryFailed => "environment query failed",
            AbortReason::RelocationFailed => "relocation failed",
            AbortReason::ActionFailed => "encounter failed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnipeOutcome {
    Committed,
    Aborted(AbortReason),
    /// No longer eligible when its turn came; nothing was touched.
    Skipped(Eligibility),
}

impl SnipeOutcome {
    pub fn is_committed(self) -> bool {
        matches!(self, SnipeOutcome::Committed)
    }
}

pub struct SnipeEngine {
    world: Arc<dyn World>,
    encounter: Arc<dyn EncounterHandler>,
    handled: Arc<HandledCache>,
    dnd: DoNotDisturb,
    cell_check: Throttle,
    altitude: f64,
    trust_identified: bool,
    settle_delay: Duration,
    state: SnipeState,
    debug: bool,
}

impl SnipeEngine {
    pub fn new(
        world: Arc<dyn World>,
        encounter: Arc<dyn EncounterHandler>,
        handled: Arc<HandledCache>,
        dnd: DoNotDisturb,
        altitude: f64,
    ) -> Self {
        Self {
            world,
            encounter,
            handled,
            dnd,
            cell_check: Throttle::new(MIN_CELL_CHECK_INTERVAL),
            altitude,
            trust_identified: false,
            settle_delay: SETTLE_DELAY,
            state: SnipeState::Idle,
            debug: false,
        }
    }

    /// Act on candidates carrying both identifiers without asking the environment.
    pub fn trust_identified(mut self, trust: bool) -> Self {
        self.trust_identified = trust;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn state(&self) -> SnipeState {
        self.state
    }

    /// One verify/commit/rollback sequence. Fails only when another snipe
    /// already holds the environment.
    pub async fn attempt(&mut self, target: &mut Target) -> SniperResult<SnipeOutcome> {
        let guard = self
            .dnd
            .try_engage()
            .ok_or_else(|| anyhow!("environment is busy with another snipe"))?;
        let origin = self.world.position();

        let outcome = match self.relocate_and_verify(target).await {
            Ok(()) => {
                info!(target: "sniper", name = %target.species_name, "yay, there really is one nearby");
                self.commit(target, origin).await
            }
            Err(reason) => {
                warn!(target: "sniper", name = %target.species_name, %reason, "damn, skipping");
                if self.return_to(origin).await.is_err() {
                    warn!(target: "sniper", "could not return to the original position");
                }
                self.transition(SnipeState::Aborted);
                SnipeOutcome::Aborted(reason)
            }
        };

        match outcome {
            SnipeOutcome::Committed => counter!("sniper_commits_total").increment(1),
            _ => counter!("sniper_aborts_total").increment(1),
        }

        self.handled.insert(target.location_hash());
        self.transition(SnipeState::Idle);
        drop(guard);
        Ok(outcome)
    }

    async fn relocate_and_verify(&mut self, target: &mut Target) -> Result<(), AbortReason> {
        info!(
            target: "sniper",
            name = %target.species_name,
            latitude = target.latitude,
            longitude = target.longitude,
            "teleporting to meet target"
        );
        self.relocate(target.latitude, target.longitude)
            .await
            .map_err(|_| AbortReason::RelocationFailed)?;
        self.transition(SnipeState::Relocated);

        // Identified candidates are never re-checked; only trusted modes act on them.
        if target.has_trusted_ids() {
            if self.trust_identified {
                self.transition(SnipeState::Verified);
                return Ok(());
            }
            self.transition(SnipeState::Unverified);
            return Err(AbortReason::NotFound);
        }

        self.transition(SnipeState::Verifying);
        let verdict = self.verify(target).await;
        self.transition(if verdict.is_ok() {
            SnipeState::Verified
        } else {
            SnipeState::Unverified
        });
        verdict
    }

    /// Look for the species around us; adopt the environment's identifiers on a match.
    async fn verify(&mut self, target: &mut Target) -> Result<(), AbortReason> {
        self.cell_check.acquire().await;
        let nearby = self.world.nearby_entities().await.map_err(|e| {
            warn!(target: "sniper", error = %e, "nearby query failed");
            AbortReason::QueryFailed
        })?;

        let found = nearby
            .find_species(target.species_id)
            .ok_or(AbortReason::NotFound)?;
        target.encounter_id = found.encounter_id;
        target.spawn_point_id = found.spawn_point_id.clone();
        Ok(())
    }

    async fn commit(&mut self, target: &Target, origin: Position) -> SnipeOutcome {
        if self.return_to(origin).await.is_err() {
            warn!(target: "sniper", "could not return to the original position, not acting");
            self.transition(SnipeState::Aborted);
            return SnipeOutcome::Aborted(AbortReason::RelocationFailed);
        }

        match self.encounter.encounter_and_capture(target).await {
            Ok(()) => {
                self.transition(SnipeState::Committed);
                SnipeOutcome::Committed
            }
            Err(e) => {
                warn!(target: "sniper", name = %target.species_name, error = %e, "encounter failed");
                self.transition(SnipeState::Aborted);
                SnipeOutcome::Aborted(AbortReason::ActionFailed)
            }
        }
    }

    async fn return_to(&self, origin: Position) -> anyhow::Result<()> {
        info!(
            target: "sniper",
            latitude = origin.latitude,
            longitude = origin.longitude,
            "teleporting back to the old position"
        );
        self.relocate(origin.latitude, origin.longitude).await
    }

    async fn relocate(&self, latitude: f64, longitude: f64) -> anyhow::Result<()> {
        let res = self.world.relocate(latitude, longitude, self.altitude).await;
        if let Err(e) = &res {
            warn!(target: "sniper", error = %e, latitude, longitude, "relocation failed");
        }
        tokio::time::sleep(self.settle_delay).await;
        res
    }

    fn transition(&mut self, next: SnipeState) {
        trace_if!(self.debug, from = ?self.state, to = ?next, "snipe state");
        self.state = next;
    }
}
