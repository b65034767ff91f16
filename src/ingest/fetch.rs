// src/ingest/fetch.rs
//! Fetch one source and map its raw JSON onto canonical [`Target`]s.
//!
//! Everything untyped stops here: values are coerced with safe defaults
//! (0, 0.0, "") and expiration times are normalized to epoch milliseconds.

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use metrics::{counter, histogram};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{SniperError, SniperResult};
use crate::ingest::http::{HttpJsonFetcher, USER_AGENT};
use crate::ingest::repair_species;
use crate::ingest::schema::{FieldMapping, SourceSchema, TimeFormat};
use crate::ingest::types::Target;
use crate::species::{normalize_species_name, SpeciesCatalog};

/// Nesting levels walked before giving up on finding a sequence.
pub const MAX_UNWRAP_DEPTH: usize = 8;

/// Assumed remaining lifetime when a source gives no usable expiration.
pub const DEFAULT_TTL_MS: i64 = 3 * 60 * 1000;

pub struct SourceFetcher<'a> {
    schema: &'a SourceSchema,
    http: &'a dyn HttpJsonFetcher,
    catalog: &'a dyn SpeciesCatalog,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(
        schema: &'a SourceSchema,
        http: &'a dyn HttpJsonFetcher,
        catalog: &'a dyn SpeciesCatalog,
    ) -> Self {
        Self {
            schema,
            http,
            catalog,
        }
    }

    pub fn schema(&self) -> &SourceSchema {
        self.schema
    }

    /// Raw records, unwrapped from whatever container the source uses.
    pub async fn fetch_raw(&self) -> SniperResult<Vec<Value>> {
        let body = self
            .http
            .fetch_json(
                &self.schema.url,
                &[("User-Agent", USER_AGENT)],
                self.schema.timeout,
            )
            .await?;
        unwrap_records(body, &self.schema.unwrap_key)
    }

    pub async fn fetch(&self) -> SniperResult<Vec<Target>> {
        let t0 = std::time::Instant::now();
        let raw = self.fetch_raw().await?;
        let out = self.normalize(&raw, Utc::now().timestamp_millis());

        histogram!("sniper_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("sniper_source_fetch_total").increment(1);
        Ok(out)
    }

    /// Map raw records onto targets. Non-object records are skipped.
    pub fn normalize(&self, raw: &[Value], now_ms: i64) -> Vec<Target> {
        raw.iter()
            .filter_map(Value::as_object)
            .map(|record| self.normalize_record(record, now_ms))
            .collect()
    }

    fn normalize_record(&self, record: &Map<String, Value>, now_ms: i64) -> Target {
        let m = &self.schema.mappings;
        let get = |mapping: &FieldMapping| -> Option<&Value> {
            if mapping.exists {
                record.get(&mapping.param)
            } else {
                None
            }
        };

        let (latitude, longitude) = if m.has_composite_coordinates() {
            split_coordinates(&coerce_string(get(&m.latitude)))
        } else {
            (coerce_f64(get(&m.latitude)), coerce_f64(get(&m.longitude)))
        };

        let expiration_ms = get(&m.expiration)
            .filter(|v| is_truthy(v))
            .and_then(|v| convert_expiration(v, m.expiration.format, &self.schema.time_mask))
            .unwrap_or(now_ms + DEFAULT_TTL_MS);

        let mut target = Target {
            iv: coerce_i64(get(&m.iv)),
            species_id: coerce_u32(get(&m.id)),
            species_name: normalize_species_name(&coerce_string(get(&m.name))),
            latitude,
            longitude,
            expiration_ms,
            last_seen_ms: expiration_ms,
            encounter_id: coerce_u64(get(&m.encounter)),
            spawn_point_id: coerce_string(get(&m.spawnpoint)),
            ..Default::default()
        };
        repair_species(&mut target, self.catalog);
        target
    }
}

/// Find the candidate sequence inside a reply.
///
/// A top-level mapping is looked up by `key`; a missing key means no records.
/// A mapping found there (one record per entry) is replaced by its values.
pub fn unwrap_records(body: Value, key: &str) -> SniperResult<Vec<Value>> {
    let mut current = match body {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    };

    for _ in 0..MAX_UNWRAP_DEPTH {
        current = match current {
            Value::Array(items) => return Ok(items),
            Value::Null => return Ok(Vec::new()),
            Value::Object(map) => Value::Array(map.into_iter().map(|(_, v)| v).collect()),
            _ => return Err(SniperError::Unwrap(MAX_UNWRAP_DEPTH)),
        };
    }
    Err(SniperError::Unwrap(MAX_UNWRAP_DEPTH))
}

fn convert_expiration(raw: &Value, format: TimeFormat, mask: &str) -> Option<i64> {
    match format {
        TimeFormat::Seconds => Some((coerce_f64(Some(raw)) * 1000.0) as i64),
        TimeFormat::Milliseconds => Some(coerce_i64(Some(raw))),
        TimeFormat::Utc => {
            let text = coerce_string(Some(raw));
            let parsed = parse_local_ms(&text, mask);
            if parsed.is_none() {
                warn!(
                    target: "sniper",
                    value = %text,
                    time_mask = mask,
                    "expiration does not match time_mask, assuming default lifetime"
                );
            }
            parsed
        }
        TimeFormat::None => None,
    }
}

/// Parse with `mask` (after `T` → space, first 19 chars) as local wall time.
pub fn parse_local_ms(raw: &str, mask: &str) -> Option<i64> {
    let cleaned: String = raw.replace('T', " ").chars().take(19).collect();
    let naive = NaiveDateTime::parse_from_str(&cleaned, mask).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// `"-31.415553, -64.190480"` → `(-31.415553, -64.19048)`.
pub fn split_coordinates(raw: &str) -> (f64, f64) {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parts = compact.split(',');
    let lat = parts.next().map(parse_f64).unwrap_or(0.0);
    let lon = parts.next().map(parse_f64).unwrap_or(0.0);
    (lat, lon)
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn parse_f64(s: &str) -> f64 {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

fn coerce_f64(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_f64(s),
        _ => 0.0,
    }
}

fn coerce_i64(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().unwrap_or_else(|_| parse_f64(s) as i64)
        }
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

fn coerce_u64(v: Option<&Value>) -> u64 {
    match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

fn coerce_u32(v: Option<&Value>) -> u32 {
    u32::try_from(coerce_i64(v)).unwrap_or(0)
}

fn coerce_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
