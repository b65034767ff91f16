// src/ingest/schema.rs
//! Declarative description of one external source: where to fetch, how to
//! unwrap the reply, and which raw keys feed the eight canonical fields.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{MappingConfig, SourceConfig};
use crate::error::{SniperError, SniperResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Iv,
    Id,
    Name,
    Latitude,
    Longitude,
    Expiration,
    Encounter,
    SpawnPoint,
}

impl FieldName {
    pub const ALL: [FieldName; 8] = [
        FieldName::Iv,
        FieldName::Id,
        FieldName::Name,
        FieldName::Latitude,
        FieldName::Longitude,
        FieldName::Expiration,
        FieldName::Encounter,
        FieldName::SpawnPoint,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Iv => "iv",
            FieldName::Id => "id",
            FieldName::Name => "name",
            FieldName::Latitude => "latitude",
            FieldName::Longitude => "longitude",
            FieldName::Expiration => "expiration",
            FieldName::Encounter => "encounter",
            FieldName::SpawnPoint => "spawnpoint",
        }
    }

    fn required(self) -> bool {
        matches!(
            self,
            FieldName::Id | FieldName::Name | FieldName::Latitude | FieldName::Longitude
        )
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a source encodes expiration times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeFormat {
    #[default]
    None,
    Utc,
    Seconds,
    Milliseconds,
}

impl FromStr for TimeFormat {
    type Err = SniperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(TimeFormat::None),
            "utc" => Ok(TimeFormat::Utc),
            "seconds" => Ok(TimeFormat::Seconds),
            "milliseconds" => Ok(TimeFormat::Milliseconds),
            other => Err(SniperError::config(format!("unrecognized format: '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub required: bool,
    pub param: String,
    pub format: TimeFormat,
    /// True iff a param name was explicitly configured.
    pub exists: bool,
}

impl FieldMapping {
    fn build(field: FieldName, cfg: Option<&MappingConfig>) -> SniperResult<Self> {
        let param = cfg.and_then(|c| c.param.clone());
        let format = match cfg.and_then(|c| c.format.as_deref()) {
            Some(f) => f.parse()?,
            None => TimeFormat::None,
        };
        Ok(Self {
            required: field.required(),
            exists: param.is_some(),
            param: param.unwrap_or_default(),
            format,
        })
    }
}

/// The eight field mappings of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mappings {
    pub iv: FieldMapping,
    pub id: FieldMapping,
    pub name: FieldMapping,
    pub latitude: FieldMapping,
    pub longitude: FieldMapping,
    pub expiration: FieldMapping,
    pub encounter: FieldMapping,
    pub spawnpoint: FieldMapping,
}

impl Mappings {
    pub fn get(&self, field: FieldName) -> &FieldMapping {
        match field {
            FieldName::Iv => &self.iv,
            FieldName::Id => &self.id,
            FieldName::Name => &self.name,
            FieldName::Latitude => &self.latitude,
            FieldName::Longitude => &self.longitude,
            FieldName::Expiration => &self.expiration,
            FieldName::Encounter => &self.encounter,
            FieldName::SpawnPoint => &self.spawnpoint,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldMapping)> {
        FieldName::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Latitude and longitude read from one `"lat, lon"` string.
    pub fn has_composite_coordinates(&self) -> bool {
        self.latitude.exists && self.latitude.param == self.longitude.param
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub url: String,
    pub unwrap_key: String,
    pub timeout: Duration,
    pub enabled: bool,
    pub time_mask: String,
    pub mappings: Mappings,
}

impl SourceSchema {
    pub fn from_config(cfg: &SourceConfig) -> SniperResult<Self> {
        let m = &cfg.mappings;
        let mappings = Mappings {
            iv: FieldMapping::build(FieldName::Iv, m.iv.as_ref())?,
            id: FieldMapping::build(FieldName::Id, m.id.as_ref())?,
            name: FieldMapping::build(FieldName::Name, m.name.as_ref())?,
            latitude: FieldMapping::build(FieldName::Latitude, m.latitude.as_ref())?,
            longitude: FieldMapping::build(FieldName::Longitude, m.longitude.as_ref())?,
            expiration: FieldMapping::build(FieldName::Expiration, m.expiration.as_ref())?,
            encounter: FieldMapping::build(FieldName::Encounter, m.encounter.as_ref())?,
            spawnpoint: FieldMapping::build(FieldName::SpawnPoint, m.spawnpoint.as_ref())?,
        };

        Ok(Self {
            url: cfg.url.clone(),
            unwrap_key: cfg.key.clone(),
            timeout: Duration::from_secs(cfg.timeout),
            enabled: cfg.enabled,
            time_mask: cfg.time_mask.clone(),
            mappings,
        })
    }
}

impl fmt::Display for SourceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
