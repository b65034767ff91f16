// tests/common/mod.rs
// Shared fakes for the collaborator seams.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use spawn_sniper::config::{MappingConfig, MappingsConfig, SourceConfig};
use spawn_sniper::error::{SniperError, SniperResult};
use spawn_sniper::ingest::http::HttpJsonFetcher;
use spawn_sniper::ingest::schema::SourceSchema;
use spawn_sniper::ingest::types::Target;
use spawn_sniper::world::{
    CollectionIndex, EncounterHandler, NearbyEntities, NearbyEntity, Position, World,
};

pub const NOW_MS: i64 = 1_700_000_000_000;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Timeout,
    Unavailable,
    Broken,
}

/// Canned replies per URL; unknown URLs are unavailable.
#[derive(Default)]
pub struct MockHttp {
    replies: Mutex<HashMap<String, Reply>>,
    pub calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, url: &str, reply: Reply) -> Self {
        self.set(url, reply);
        self
    }

    pub fn set(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }
}

#[async_trait]
impl HttpJsonFetcher for MockHttp {
    async fn fetch_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        _timeout: Duration,
    ) -> SniperResult<Value> {
        self.calls.lock().unwrap().push((
            url.to_string(),
            headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(Reply::Json(v)) => Ok(v),
            Some(Reply::Timeout) => Err(SniperError::Timeout),
            Some(Reply::Broken) => Err(SniperError::Other(anyhow::anyhow!("tls handshake eof"))),
            Some(Reply::Unavailable) | None => Err(SniperError::Unavailable(url.to_string())),
        }
    }
}

pub fn mapping(param: &str) -> Option<MappingConfig> {
    Some(MappingConfig {
        param: Some(param.to_string()),
        format: None,
    })
}

pub fn mapping_fmt(param: &str, format: &str) -> Option<MappingConfig> {
    Some(MappingConfig {
        param: Some(param.to_string()),
        format: Some(format.to_string()),
    })
}

/// iv/id/name/lat/lon/expiration(seconds) under the usual short names.
pub fn source_config(url: &str) -> SourceConfig {
    SourceConfig {
        url: url.to_string(),
        key: "pokemons".to_string(),
        enabled: true,
        mappings: MappingsConfig {
            iv: mapping("iv"),
            id: mapping("pokemon_id"),
            name: mapping("name"),
            latitude: mapping("lat"),
            longitude: mapping("lng"),
            expiration: mapping_fmt("despawn", "seconds"),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn schema(url: &str) -> SourceSchema {
    SourceSchema::from_config(&source_config(url)).unwrap()
}

/// A record matching [`source_config`], expiring a minute from the real clock.
pub fn record(lat: f64, lng: f64, pokemon_id: u32) -> Value {
    let despawn = chrono::Utc::now().timestamp() + 60;
    serde_json::json!({
        "iv": 0,
        "pokemon_id": pokemon_id,
        "name": "",
        "lat": lat,
        "lng": lng,
        "despawn": despawn,
    })
}

pub fn target(species_id: u32, lat: f64, lon: f64) -> Target {
    Target {
        species_id,
        latitude: lat,
        longitude: lon,
        expiration_ms: chrono::Utc::now().timestamp_millis() + 60_000,
        ..Default::default()
    }
}

pub struct FakeWorld {
    pub home: Position,
    pub moves: Mutex<Vec<(f64, f64, f64)>>,
    pub nearby: Mutex<Vec<NearbyEntity>>,
    pub queries: Mutex<u32>,
    pub fail_relocate_to: Mutex<Option<(f64, f64)>>,
    pub fail_queries: Mutex<bool>,
    pub resume_at: Mutex<Option<chrono::DateTime<chrono::Local>>>,
}

impl FakeWorld {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            home: Position {
                latitude,
                longitude,
            },
            moves: Mutex::new(Vec::new()),
            nearby: Mutex::new(Vec::new()),
            queries: Mutex::new(0),
            fail_relocate_to: Mutex::new(None),
            fail_queries: Mutex::new(false),
            resume_at: Mutex::new(None),
        }
    }

    pub fn spawn(&self, species_id: u32, encounter_id: u64, spawn_point_id: &str) {
        self.nearby.lock().unwrap().push(NearbyEntity {
            species_id,
            encounter_id,
            spawn_point_id: spawn_point_id.to_string(),
        });
    }

    pub fn moves(&self) -> Vec<(f64, f64)> {
        self.moves
            .lock()
            .unwrap()
            .iter()
            .map(|(lat, lon, _)| (*lat, *lon))
            .collect()
    }

    pub fn queries(&self) -> u32 {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl World for FakeWorld {
    fn position(&self) -> Position {
        self.home
    }

    async fn relocate(&self, latitude: f64, longitude: f64, altitude: f64) -> anyhow::Result<()> {
        self.moves.lock().unwrap().push((latitude, longitude, altitude));
        if *self.fail_relocate_to.lock().unwrap() == Some((latitude, longitude)) {
            anyhow::bail!("teleport refused");
        }
        Ok(())
    }

    async fn nearby_entities(&self) -> anyhow::Result<NearbyEntities> {
        *self.queries.lock().unwrap() += 1;
        if *self.fail_queries.lock().unwrap() {
            anyhow::bail!("map objects unavailable");
        }
        Ok(NearbyEntities {
            passive: self.nearby.lock().unwrap().clone(),
            catchable: Vec::new(),
        })
    }

    fn catch_resume_at(&self) -> Option<chrono::DateTime<chrono::Local>> {
        *self.resume_at.lock().unwrap()
    }
}

#[derive(Default)]
pub struct Recorder {
    pub encounters: Mutex<Vec<Target>>,
    pub fail: Mutex<bool>,
}

impl Recorder {
    pub fn count(&self) -> usize {
        self.encounters.lock().unwrap().len()
    }
}

#[async_trait]
impl EncounterHandler for Recorder {
    async fn encounter_and_capture(&self, target: &Target) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("encounter refused");
        }
        self.encounters.lock().unwrap().push(target.clone());
        Ok(())
    }
}

pub struct Collected(pub Vec<u32>);

impl CollectionIndex for Collected {
    fn is_collected(&self, species_id: u32) -> bool {
        self.0.contains(&species_id)
    }
}
