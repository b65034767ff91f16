//! Dry run: validate the configured sources, poll them once and print the
//! ranked eligible targets as JSON. Never touches an environment.

use std::sync::Arc;

use chrono::Utc;
use spawn_sniper::config::{load_config_default, load_config_from, SniperSettings};
use spawn_sniper::eligibility::EligibilityFilter;
use spawn_sniper::handled::HandledCache;
use spawn_sniper::ingest::http::ReqwestFetcher;
use spawn_sniper::ingest::validate::ValidationOutcome;
use spawn_sniper::ingest::Aggregator;
use spawn_sniper::metrics::install_exporter_from_env;
use spawn_sniper::ranking::Ranker;
use spawn_sniper::species::StaticCatalog;
use spawn_sniper::world::CollectionIndex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Treats every species as not yet collected.
struct EmptyCollection;

impl CollectionIndex for EmptyCollection {
    fn is_collected(&self, _species_id: u32) -> bool {
        false
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spawn_sniper=info,sniper=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => load_config_from(std::path::Path::new(&path))?,
        None => load_config_default()?,
    };
    if install_exporter_from_env()? {
        tracing::info!("prometheus exporter installed");
    }

    let catalog = Arc::new(StaticCatalog::default_seed());
    let settings = SniperSettings::resolve(&cfg, catalog.as_ref())?;
    let mut aggregator = Aggregator::new(
        settings.sources.clone(),
        Arc::new(ReqwestFetcher::new()),
        catalog.clone(),
    )
    .with_debug(settings.debug);

    for (url, outcome) in aggregator.validate_pending().await? {
        match outcome {
            ValidationOutcome::Activated => println!("ok        {url}"),
            ValidationOutcome::Disabled => println!("disabled  {url}"),
            ValidationOutcome::Rejected(why) => println!("rejected  {url}: {why}"),
            ValidationOutcome::StillPending(why) => println!("pending   {url}: {why}"),
        }
    }
    if aggregator.registry().is_exhausted() {
        anyhow::bail!("no usable source");
    }

    let candidates = aggregator.poll().await;
    let total = candidates.len();
    let mut targets = EligibilityFilter::from_settings(&settings).select(
        candidates,
        &HandledCache::new(),
        &EmptyCollection,
        catalog.as_ref(),
        Utc::now().timestamp_millis(),
    );
    Ranker::new(settings.order.clone()).rank(&mut targets);

    eprintln!("{} candidates, {} eligible", total, targets.len());
    println!("{}", serde_json::to_string_pretty(&targets)?);
    Ok(())
}
