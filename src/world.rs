//! Interfaces to the live environment the sniper acts in.
//!
//! The host supplies movement, nearby-entity queries, collection lookups
//! and the encounter/capture action. None of that is implemented here.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ingest::types::Target;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// One entity reported by the environment around the current position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NearbyEntity {
    pub species_id: u32,
    pub encounter_id: u64,
    pub spawn_point_id: String,
}

impl NearbyEntity {
    /// Read a raw map-cell record. The species id sits either under
    /// `pokemon_data.pokemon_id` or at the top level.
    pub fn from_value(v: &Value) -> Option<Self> {
        let species_id = v
            .pointer("/pokemon_data/pokemon_id")
            .or_else(|| v.get("pokemon_id"))
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())?;
        let encounter_id = match v.get("encounter_id") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        };
        let spawn_point_id = v
            .get("spawn_point_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self {
            species_id,
            encounter_id,
            spawn_point_id,
        })
    }
}

/// Passively visible and actively catchable entities.
#[derive(Debug, Clone, Default)]
pub struct NearbyEntities {
    pub passive: Vec<NearbyEntity>,
    pub catchable: Vec<NearbyEntity>,
}

impl NearbyEntities {
    pub fn iter(&self) -> impl Iterator<Item = &NearbyEntity> {
        self.passive.iter().chain(self.catchable.iter())
    }

    pub fn find_species(&self, species_id: u32) -> Option<&NearbyEntity> {
        self.iter().find(|e| e.species_id == species_id)
    }
}

#[async_trait]
pub trait World: Send + Sync {
    fn position(&self) -> Position;

    /// Blocking "set world position".
    async fn relocate(&self, latitude: f64, longitude: f64, altitude: f64) -> anyhow::Result<()>;

    async fn nearby_entities(&self) -> anyhow::Result<NearbyEntities>;

    /// Set while catching is paused by the host; cycles are skipped until then.
    fn catch_resume_at(&self) -> Option<DateTime<Local>> {
        None
    }
}

#[async_trait]
pub trait EncounterHandler: Send + Sync {
    /// Encounter and capture using the target's (authoritative) identifiers.
    async fn encounter_and_capture(&self, target: &Target) -> anyhow::Result<()>;
}

pub trait CollectionIndex: Send + Sync {
    fn is_collected(&self, species_id: u32) -> bool;
}

/// Process-wide "do not disturb" flag held for the whole of a snipe.
/// Other components check [`DoNotDisturb::is_engaged`] before touching the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct DoNotDisturb {
    flag: Arc<AtomicBool>,
}

impl DoNotDisturb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `None` while someone else holds it.
    pub fn try_engage(&self) -> Option<DndGuard> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DndGuard {
                flag: Arc::clone(&self.flag),
            })
    }
}

/// Releases the flag on drop.
#[derive(Debug)]
pub struct DndGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for DndGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
