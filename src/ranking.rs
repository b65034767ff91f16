//! Descending multi-key ordering of eligible candidates.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::SniperError;
use crate::ingest::types::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingKey {
    Iv,
    Vip,
    Missing,
    Priority,
    Expiration,
}

impl RankingKey {
    fn value(self, t: &Target) -> i64 {
        match self {
            RankingKey::Iv => t.iv,
            RankingKey::Vip => i64::from(t.vip),
            RankingKey::Missing => i64::from(t.missing),
            RankingKey::Priority => t.priority,
            RankingKey::Expiration => t.expiration_ms,
        }
    }
}

impl FromStr for RankingKey {
    type Err = SniperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iv" => Ok(RankingKey::Iv),
            "vip" => Ok(RankingKey::Vip),
            "missing" => Ok(RankingKey::Missing),
            "priority" => Ok(RankingKey::Priority),
            "expiration_timestamp_ms" | "expiration" => Ok(RankingKey::Expiration),
            other => Err(SniperError::config(format!("unrecognized ordering: '{other}'"))),
        }
    }
}

impl fmt::Display for RankingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RankingKey::Iv => "iv",
            RankingKey::Vip => "vip",
            RankingKey::Missing => "missing",
            RankingKey::Priority => "priority",
            RankingKey::Expiration => "expiration_timestamp_ms",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Ranker {
    order: Vec<RankingKey>,
}

impl Ranker {
    pub fn new(order: Vec<RankingKey>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[RankingKey] {
        &self.order
    }

    /// Keys compared left to right, all descending.
    pub fn compare(&self, a: &Target, b: &Target) -> Ordering {
        self.order
            .iter()
            .map(|k| k.value(b).cmp(&k.value(a)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Stable: full ties keep their incoming order.
    pub fn rank(&self, targets: &mut [Target]) {
        targets.sort_by(|a, b| self.compare(a, b));
    }
}
