// src/ingest/http.rs
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::{SniperError, SniperResult};

/// Some sources refuse requests without a browser-like agent.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/52.0.2743.116 Safari/537.36";

/// "GET with timeout, parse as JSON". Timeouts and connection failures must
/// surface as [`SniperError::Timeout`] / [`SniperError::Unavailable`].
#[async_trait]
pub trait HttpJsonFetcher: Send + Sync {
    async fn fetch_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> SniperResult<Value>;
}

#[derive(Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpJsonFetcher for ReqwestFetcher {
    async fn fetch_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> SniperResult<Value> {
        let mut req = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send().await.map_err(classify)?;
        resp.json::<Value>().await.map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> SniperError {
    if e.is_timeout() {
        SniperError::Timeout
    } else if e.is_connect() {
        SniperError::Unavailable(e.to_string())
    } else {
        SniperError::Other(anyhow::Error::new(e).context("source http get()"))
    }
}
