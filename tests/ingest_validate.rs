// tests/ingest_validate.rs
mod common;

use common::{mapping, record, source_config, MockHttp, Reply};
use serde_json::json;
use spawn_sniper::ingest::schema::SourceSchema;
use spawn_sniper::ingest::validate::{validate_sample, SourceRegistry, ValidationOutcome};
use spawn_sniper::species::StaticCatalog;
use spawn_sniper::SniperError;

fn schema_for(url: &str, enabled: bool) -> SourceSchema {
    let mut cfg = source_config(url);
    cfg.enabled = enabled;
    SourceSchema::from_config(&cfg).unwrap()
}

#[test]
fn every_missing_param_is_reported_at_once() {
    let mut cfg = source_config("http://a.test");
    cfg.mappings.encounter = mapping("encounter_id");
    let schema = SourceSchema::from_config(&cfg).unwrap();

    let sample = vec![json!({"pokemon_id": 1, "name": "x", "lat": 1.0, "despawn": 1})];
    match validate_sample(&schema, &sample) {
        Err(SniperError::Mapping(missing)) => {
            assert_eq!(missing, vec!["iv", "lng", "encounter_id"]);
        }
        other => panic!("unexpected: {other:?}"),
    }

    let err = validate_sample(&schema, &sample).unwrap_err();
    assert_eq!(
        err.to_string(),
        "the following params dont exist: iv, lng, encounter_id"
    );
}

#[test]
fn undeclared_fields_are_not_checked() {
    let mut cfg = source_config("http://a.test");
    cfg.mappings.iv = None;
    let schema = SourceSchema::from_config(&cfg).unwrap();
    let sample = vec![json!({"pokemon_id": 1, "name": "x", "lat": 1.0, "lng": 2.0, "despawn": 1})];
    assert!(validate_sample(&schema, &sample).is_ok());
}

#[test]
fn empty_sample_is_structural() {
    let err = validate_sample(&schema_for("http://a.test", true), &[]).unwrap_err();
    assert!(matches!(err, SniperError::EmptySample));
    assert!(err.is_structural());
}

#[tokio::test]
async fn pending_sources_settle_by_failure_kind() {
    let http = MockHttp::new()
        .reply("http://good.test", Reply::Json(json!({"pokemons": [record(1.0, 2.0, 1)]})))
        .reply("http://bad.test", Reply::Json(json!({"pokemons": [{"lat": 1.0}]})))
        .reply("http://slow.test", Reply::Timeout);
    let catalog = StaticCatalog::default_seed();
    let mut registry = SourceRegistry::new(vec![
        schema_for("http://off.test", false),
        schema_for("http://good.test", true),
        schema_for("http://bad.test", true),
        schema_for("http://slow.test", true),
    ]);

    let report = registry.validate_pending(&http, &catalog).await.unwrap();

    assert_eq!(report[0], ("http://off.test".to_string(), ValidationOutcome::Disabled));
    assert_eq!(report[1].1, ValidationOutcome::Activated);
    assert!(matches!(report[2].1, ValidationOutcome::Rejected(_)));
    assert!(matches!(report[3].1, ValidationOutcome::StillPending(_)));
    assert_eq!(http.calls_to("http://off.test"), 0);

    let active: Vec<&str> = registry.active().iter().map(|s| s.url.as_str()).collect();
    assert_eq!(active, vec!["http://good.test"]);
    let pending: Vec<&str> = registry.pending().iter().map(|s| s.url.as_str()).collect();
    assert_eq!(pending, vec!["http://slow.test"]);

    // The slow source comes back on a later cycle.
    http.set("http://slow.test", Reply::Json(json!({"pokemons": [record(3.0, 4.0, 2)]})));
    registry.validate_pending(&http, &catalog).await.unwrap();
    assert_eq!(registry.active().len(), 2);
    assert!(!registry.has_pending());
}

#[tokio::test]
async fn unexpected_errors_propagate_and_keep_sources_pending() {
    let http = MockHttp::new().reply("http://weird.test", Reply::Broken);
    let catalog = StaticCatalog::default_seed();
    let mut registry = SourceRegistry::new(vec![
        schema_for("http://weird.test", true),
        schema_for("http://later.test", true),
    ]);

    assert!(registry.validate_pending(&http, &catalog).await.is_err());
    assert_eq!(registry.pending().len(), 2);
    assert!(registry.active().is_empty());
}

#[tokio::test]
async fn unreachable_sources_stay_pending() {
    let http = MockHttp::new();
    let catalog = StaticCatalog::default_seed();
    let mut registry = SourceRegistry::new(vec![schema_for("http://down.test", true)]);

    let report = registry.validate_pending(&http, &catalog).await.unwrap();
    assert!(matches!(report[0].1, ValidationOutcome::StillPending(_)));
    assert!(!registry.is_exhausted());
}
