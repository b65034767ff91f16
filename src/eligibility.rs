//! # Eligibility
//! Keep/drop decision for one candidate, plus the annotation pass that
//! attaches catch-list, VIP, missing and priority flags before ranking.
//!
//! Decision order (first match wins):
//! 1. already handled → drop
//! 2. expired, or no timestamp at all → drop
//! 3. species on the catch list → keep
//! 4. nonzero IV strictly below `special_iv` → keep (lower stored value is rarer)
//! 5. VIP species → keep
//! 6. species missing from the collection → keep
//! 7. otherwise → drop

use std::collections::{HashMap, HashSet};

use crate::config::SniperSettings;
use crate::handled::HandledCache;
use crate::ingest::types::Target;
use crate::species::SpeciesCatalog;
use crate::world::CollectionIndex;

/// Why a candidate was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Handled,
    Expired,
    CatchList,
    SpecialIv,
    Vip,
    Missing,
    Unwanted,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        matches!(
            self,
            Eligibility::CatchList | Eligibility::SpecialIv | Eligibility::Vip | Eligibility::Missing
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct EligibilityFilter {
    special_iv: i64,
    /// species id → priority
    catch: HashMap<u32, i64>,
    vips: HashSet<u32>,
    debug: bool,
}

impl EligibilityFilter {
    pub fn new(special_iv: i64, catch: HashMap<u32, i64>, vips: HashSet<u32>) -> Self {
        Self {
            special_iv,
            catch,
            vips,
            debug: false,
        }
    }

    pub fn from_settings(s: &SniperSettings) -> Self {
        Self::new(s.special_iv, s.catch.clone(), s.vips.clone()).with_debug(s.debug)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn evaluate(&self, t: &Target, handled: &HandledCache, now_ms: i64) -> Eligibility {
        let verdict = if handled.contains(&t.location_hash()) {
            Eligibility::Handled
        } else if t.expiry_reference_ms() <= 0 || t.expiry_reference_ms() < now_ms {
            Eligibility::Expired
        } else if self.catch.contains_key(&t.species_id) {
            Eligibility::CatchList
        } else if t.iv != 0 && t.iv < self.special_iv {
            Eligibility::SpecialIv
        } else if t.vip {
            Eligibility::Vip
        } else if t.missing {
            Eligibility::Missing
        } else {
            Eligibility::Unwanted
        };

        trace_if!(
            self.debug,
            name = %t.species_name,
            location = %t.location_hash(),
            ?verdict,
            "eligibility"
        );
        verdict
    }

    pub fn is_eligible(&self, t: &Target, handled: &HandledCache, now_ms: i64) -> bool {
        self.evaluate(t, handled, now_ms).is_eligible()
    }

    /// Attach derived flags; repairs a missing species name from the catalog.
    pub fn annotate(
        &self,
        t: &mut Target,
        collection: &dyn CollectionIndex,
        catalog: &dyn SpeciesCatalog,
    ) {
        if t.species_name.is_empty() {
            t.species_name = catalog.name_for(t.species_id).unwrap_or_default();
        }
        t.on_catch_list = self.catch.contains_key(&t.species_id);
        t.vip = self.vips.contains(&t.species_id);
        t.missing = !collection.is_collected(t.species_id);
        t.priority = self.catch.get(&t.species_id).copied().unwrap_or(0);
    }

    /// Annotate every candidate and keep the eligible ones, order preserved.
    pub fn select(
        &self,
        targets: Vec<Target>,
        handled: &HandledCache,
        collection: &dyn CollectionIndex,
        catalog: &dyn SpeciesCatalog,
        now_ms: i64,
    ) -> Vec<Target> {
        targets
            .into_iter()
            .filter_map(|mut t| {
                self.annotate(&mut t, collection, catalog);
                self.is_eligible(&t, handled, now_ms).then_some(t)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::StaticCatalog;

    const NOW: i64 = 1_700_000_000_000;

    struct Collected(Vec<u32>);
    impl CollectionIndex for Collected {
        fn is_collected(&self, species_id: u32) -> bool {
            self.0.contains(&species_id)
        }
    }

    fn target(species_id: u32, iv: i64) -> Target {
        Target {
            species_id,
            iv,
            latitude: species_id as f64,
            longitude: 1.0,
            expiration_ms: NOW + 60_000,
            ..Default::default()
        }
    }

    fn filter() -> EligibilityFilter {
        EligibilityFilter::new(
            90,
            HashMap::from([(149, 5)]),
            HashSet::from([143]),
        )
    }

    #[test]
    fn decision_order_is_respected() {
        let f = filter();
        let cache = HandledCache::new();
        let collected = Collected(vec![16, 143, 149]);
        let catalog = StaticCatalog::default_seed();

        let mut cases = vec![
            (target(149, 0), Eligibility::CatchList),
            (target(16, 45), Eligibility::SpecialIv),
            (target(16, 95), Eligibility::Unwanted),
            (target(143, 0), Eligibility::Vip),
            (target(150, 0), Eligibility::Missing),
            (target(16, 0), Eligibility::Unwanted),
        ];
        for (t, expected) in cases.iter_mut() {
            f.annotate(t, &collected, &catalog);
            assert_eq!(f.evaluate(t, &cache, NOW), *expected, "{}", t.species_name);
        }
    }

    #[test]
    fn handled_and_expired_always_lose() {
        let f = filter();
        let cache = HandledCache::new();
        let mut t = target(149, 10);

        t.expiration_ms = NOW - 1;
        assert_eq!(f.evaluate(&t, &cache, NOW), Eligibility::Expired);

        t.expiration_ms = 0;
        t.last_seen_ms = 0;
        assert_eq!(f.evaluate(&t, &cache, NOW), Eligibility::Expired);

        t.last_seen_ms = NOW + 1;
        assert!(f.is_eligible(&t, &cache, NOW));

        cache.insert(t.location_hash());
        assert_eq!(f.evaluate(&t, &cache, NOW), Eligibility::Handled);
        // re-evaluation never flips back
        assert!(!f.is_eligible(&t, &cache, NOW));
    }

    #[test]
    fn annotate_sets_priority_and_repairs_name() {
        let f = filter();
        let mut t = target(149, 0);
        f.annotate(&mut t, &Collected(vec![]), &StaticCatalog::default_seed());
        assert_eq!(t.species_name, "Dragonite");
        assert!(t.on_catch_list && t.missing && !t.vip);
        assert_eq!(t.priority, 5);
    }
}
