use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// Env var holding the listen address of the optional Prometheus endpoint.
pub const ENV_METRICS_ADDR: &str = "SNIPER_METRICS_ADDR";

pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sniper_source_fetch_total", "Records returned per source fetch.");
        describe_counter!(
            "sniper_source_errors_total",
            "Source fetches that failed and were skipped."
        );
        describe_counter!("sniper_candidates_total", "Candidates after merging sources.");
        describe_counter!(
            "sniper_dedup_total",
            "Candidates dropped because another source reported the same location first."
        );
        describe_counter!("sniper_shots_total", "Snipe attempts that touched the environment.");
        describe_counter!("sniper_commits_total", "Snipes that ended in an encounter.");
        describe_counter!("sniper_aborts_total", "Snipes that rolled back without acting.");
        describe_histogram!("sniper_fetch_ms", "Source fetch time in milliseconds.");
        describe_gauge!("sniper_handled_cache_size", "Entries in the handled-location cache.");
        describe_gauge!(
            "sniper_last_poll_ts",
            "Unix timestamp (seconds) of the last completed polling round."
        );
    });
}

/// Install the global recorder with an HTTP scrape listener on `addr`.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus exporter on {addr}: {e}"))?;
    ensure_metrics_described();
    Ok(())
}

/// Reads [`ENV_METRICS_ADDR`]; `Ok(false)` when unset.
pub fn install_exporter_from_env() -> anyhow::Result<bool> {
    let Ok(raw) = std::env::var(ENV_METRICS_ADDR) else {
        return Ok(false);
    };
    let addr: SocketAddr = raw
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{ENV_METRICS_ADDR}='{raw}': {e}"))?;
    install_exporter(addr)?;
    Ok(true)
}
