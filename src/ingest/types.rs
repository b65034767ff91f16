// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Canonical candidate record. Every raw value is coerced at ingestion,
/// so numbers default to zero and strings to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub iv: i64,
    pub species_id: u32,
    pub species_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub expiration_ms: i64,
    pub last_seen_ms: i64,
    pub encounter_id: u64,
    pub spawn_point_id: String,

    // Filled in by eligibility annotation.
    pub on_catch_list: bool,
    pub vip: bool,
    pub missing: bool,
    pub priority: i64,
}

impl Target {
    /// Identity key. IDs are not trusted, sources mislabel species.
    pub fn location_hash(&self) -> LocationHash {
        LocationHash::new(self.latitude, self.longitude)
    }

    /// Both identifiers the environment needs to act without verifying first.
    pub fn has_trusted_ids(&self) -> bool {
        self.encounter_id != 0 && !self.spawn_point_id.is_empty()
    }

    /// Expiration if known, otherwise the last-seen timestamp.
    pub fn expiry_reference_ms(&self) -> i64 {
        if self.expiration_ms != 0 {
            self.expiration_ms
        } else {
            self.last_seen_ms
        }
    }
}

/// `"{lat:.4};{lon:.4}"`, roughly ten metres of precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationHash(String);

impl LocationHash {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self(format!("{latitude:.4};{longitude:.4}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Externally pushed candidates ("social" mode).
pub trait LiveFeed: Send + Sync {
    fn snapshot(&self) -> Vec<Target>;
}

/// Thread-safe feed an external subscriber pushes canonical records into.
#[derive(Debug, Clone, Default)]
pub struct SharedFeed {
    inner: Arc<Mutex<Vec<Target>>>,
}

impl SharedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, target: Target) {
        self.inner.lock().expect("feed mutex poisoned").push(target);
    }

    /// Swap the whole list, as subscribers do on every broadcast.
    pub fn replace(&self, targets: Vec<Target>) {
        *self.inner.lock().expect("feed mutex poisoned") = targets;
    }

    pub fn clear(&self) {
        self.inner.lock().expect("feed mutex poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("feed mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LiveFeed for SharedFeed {
    fn snapshot(&self) -> Vec<Target> {
        self.inner.lock().expect("feed mutex poisoned").clone()
    }
}
