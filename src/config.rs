// src/config.rs
//! Sniper configuration: raw serde shape, file loading, and startup
//! validation into [`SniperSettings`].

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{SniperError, SniperResult};
use crate::ingest::schema::SourceSchema;
use crate::ranking::RankingKey;
use crate::species::SpeciesCatalog;

pub const ENV_CONFIG_PATH: &str = "SNIPER_CONFIG_PATH";
pub const DEFAULT_TIME_MASK: &str = "%Y-%m-%d %H:%M:%S";

fn default_special_iv() -> i64 {
    100
}
fn default_bullets() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_mode() -> String {
    "social".to_string()
}
fn default_order() -> Vec<String> {
    vec!["missing".into(), "vip".into(), "priority".into()]
}
fn default_timeout() -> u64 {
    5
}
fn default_time_mask() -> String {
    DEFAULT_TIME_MASK.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SniperConfig {
    #[serde(default)]
    pub debug: bool,
    /// Scores strictly below this (and nonzero) qualify on their own.
    #[serde(default = "default_special_iv")]
    pub special_iv: i64,
    #[serde(default = "default_bullets")]
    pub bullets: u32,
    #[serde(default = "default_true")]
    pub homing_shots: bool,
    /// "url" | "social"
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_order")]
    pub order: Vec<String>,
    /// species name → priority
    #[serde(default)]
    pub catch: HashMap<String, i64>,
    #[serde(default)]
    pub vips: Vec<String>,
    #[serde(default)]
    pub altitude: AltitudeRange,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            debug: false,
            special_iv: default_special_iv(),
            bullets: default_bullets(),
            homing_shots: true,
            mode: default_mode(),
            order: default_order(),
            catch: HashMap::new(),
            vips: Vec::new(),
            altitude: AltitudeRange::default(),
            sources: Vec::new(),
        }
    }
}

/// Metres. One value is drawn from this range per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AltitudeRange {
    fn default() -> Self {
        Self {
            min: 8.0,
            max: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub key: String,
    /// seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_time_mask")]
    pub time_mask: String,
    #[serde(default)]
    pub mappings: MappingsConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            timeout: default_timeout(),
            enabled: false,
            time_mask: default_time_mask(),
            mappings: MappingsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingsConfig {
    pub iv: Option<MappingConfig>,
    pub id: Option<MappingConfig>,
    pub name: Option<MappingConfig>,
    pub latitude: Option<MappingConfig>,
    pub longitude: Option<MappingConfig>,
    pub expiration: Option<MappingConfig>,
    pub encounter: Option<MappingConfig>,
    pub spawnpoint: Option<MappingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    pub param: Option<String>,
    pub format: Option<String>,
}

/// Where candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniperMode {
    Url,
    Social,
}

impl FromStr for SniperMode {
    type Err = SniperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(SniperMode::Url),
            "social" => Ok(SniperMode::Social),
            other => Err(SniperError::config(format!("unrecognized mode: '{other}'"))),
        }
    }
}

impl fmt::Display for SniperMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SniperMode::Url => "url",
            SniperMode::Social => "social",
        })
    }
}

/// Validated, typed configuration. Species names are resolved to ids.
#[derive(Debug, Clone)]
pub struct SniperSettings {
    pub debug: bool,
    pub special_iv: i64,
    pub bullets: u32,
    pub homing_shots: bool,
    pub mode: SniperMode,
    pub order: Vec<RankingKey>,
    /// species id → priority
    pub catch: HashMap<u32, i64>,
    pub vips: HashSet<u32>,
    pub altitude: AltitudeRange,
    pub sources: Vec<SourceSchema>,
}

impl SniperSettings {
    pub fn resolve(cfg: &SniperConfig, catalog: &dyn SpeciesCatalog) -> SniperResult<Self> {
        let order = cfg
            .order
            .iter()
            .map(|k| k.parse::<RankingKey>())
            .collect::<SniperResult<Vec<_>>>()?;
        let mode = cfg.mode.parse::<SniperMode>()?;

        let mut catch = HashMap::with_capacity(cfg.catch.len());
        for (name, priority) in &cfg.catch {
            catch.insert(species_id(catalog, name)?, *priority);
        }
        let vips = cfg
            .vips
            .iter()
            .map(|name| species_id(catalog, name))
            .collect::<SniperResult<HashSet<_>>>()?;

        let sources = cfg
            .sources
            .iter()
            .map(SourceSchema::from_config)
            .collect::<SniperResult<Vec<_>>>()?;

        if cfg.altitude.min > cfg.altitude.max {
            return Err(SniperError::config(format!(
                "altitude range is empty: {}..{}",
                cfg.altitude.min, cfg.altitude.max
            )));
        }

        Ok(Self {
            debug: cfg.debug,
            special_iv: cfg.special_iv,
            bullets: cfg.bullets,
            homing_shots: cfg.homing_shots,
            mode,
            order,
            catch,
            vips,
            altitude: cfg.altitude,
            sources,
        })
    }
}

fn species_id(catalog: &dyn SpeciesCatalog, name: &str) -> SniperResult<u32> {
    catalog
        .id_for(name)
        .ok_or_else(|| SniperError::config(format!("unknown species: '{name}'")))
}

/// Load configuration from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> anyhow::Result<SniperConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sniper config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load configuration using env var + fallbacks:
/// 1) $SNIPER_CONFIG_PATH
/// 2) config/sniper.toml
/// 3) config/sniper.json
/// 4) built-in defaults
pub fn load_config_default() -> anyhow::Result<SniperConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sniper.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sniper.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(SniperConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> anyhow::Result<SniperConfig> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return serde_json::from_str(s).context("parsing sniper config json");
    }
    toml::from_str(s).context("parsing sniper config toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::StaticCatalog;

    #[test]
    fn toml_and_json_share_one_shape() {
        let toml = r#"
mode = "url"
bullets = 2
order = ["iv", "expiration_timestamp_ms"]

[catch]
Dragonite = 10

[[sources]]
url = "http://example.test/a"
enabled = true

[sources.mappings.latitude]
param = "lat"
"#;
        let json = r#"{"mode":"url","bullets":2,"catch":{"Dragonite":10},
            "order":["iv","expiration_timestamp_ms"],
            "sources":[{"url":"http://example.test/a","enabled":true,
                        "mappings":{"latitude":{"param":"lat"}}}]}"#;

        for cfg in [parse_config(toml, "toml").unwrap(), parse_config(json, "").unwrap()] {
            assert_eq!(cfg.mode, "url");
            assert_eq!(cfg.bullets, 2);
            assert!(cfg.homing_shots);
            assert_eq!(cfg.special_iv, 100);
            assert_eq!(cfg.sources[0].timeout, 5);
            assert_eq!(cfg.sources[0].time_mask, DEFAULT_TIME_MASK);
            let lat = cfg.sources[0].mappings.latitude.as_ref().unwrap();
            assert_eq!(lat.param.as_deref(), Some("lat"));
        }
    }

    #[test]
    fn resolve_maps_species_names_to_ids() {
        let mut cfg = SniperConfig::default();
        cfg.catch.insert("Dragonite".into(), 10);
        cfg.vips = vec!["Snorlax".into()];

        let s = SniperSettings::resolve(&cfg, &StaticCatalog::default_seed()).unwrap();
        assert_eq!(s.mode, SniperMode::Social);
        assert_eq!(s.catch.get(&149), Some(&10));
        assert!(s.vips.contains(&143));
        assert_eq!(
            s.order,
            vec![RankingKey::Missing, RankingKey::Vip, RankingKey::Priority]
        );
    }

    #[test]
    fn unrecognized_values_fail_at_startup() {
        let catalog = StaticCatalog::default_seed();

        let bad_mode = SniperConfig {
            mode: "carrier-pigeon".into(),
            ..Default::default()
        };
        assert!(matches!(
            SniperSettings::resolve(&bad_mode, &catalog),
            Err(SniperError::Config(_))
        ));

        let bad_order = SniperConfig {
            order: vec!["cuteness".into()],
            ..Default::default()
        };
        assert!(matches!(
            SniperSettings::resolve(&bad_order, &catalog),
            Err(SniperError::Config(_))
        ));

        let bad_vip = SniperConfig {
            vips: vec!["Agumon".into()],
            ..Default::default()
        };
        assert!(matches!(
            SniperSettings::resolve(&bad_vip, &catalog),
            Err(SniperError::Config(_))
        ));
    }
}
