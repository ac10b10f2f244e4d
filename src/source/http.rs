//! REST source.
//!
//! Talks to a read-only HTTP endpoint exposing `GET /indicators` and
//! `GET /records`, both filtered by a comma-separated id list.

use super::IndicatorSource;
use crate::error::{EngineError, Result};
use crate::models::{Indicator, IndicatorId, MeasurementRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// HTTP-backed indicator source.
pub struct HttpSource {
    base_url: String,
    api_token: Option<String>,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl HttpSource {
    /// Create a source for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, api_token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            timeout_seconds,
            http_client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let mut request = self.http_client.get(&url).query(query);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            EngineError::fetch(
                what,
                request_error_message(&e, &self.base_url, self.timeout_seconds),
            )
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::fetch(what, format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(EngineError::fetch(what, format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body).map_err(|source| EngineError::Decode { what, source })
    }
}

/// Human-readable description of a transport failure.
pub(crate) fn request_error_message(error: &reqwest::Error, url: &str, timeout: u64) -> String {
    if error.is_timeout() {
        format!("request timed out after {}s", timeout)
    } else if error.is_connect() {
        format!("cannot connect to {}", url)
    } else {
        format!("failed to send request: {}", error)
    }
}

fn joined(ids: &[IndicatorId]) -> String {
    ids.iter()
        .map(IndicatorId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl IndicatorSource for HttpSource {
    async fn list_indicators(&self) -> Result<Vec<Indicator>> {
        self.get_json("indicators", "indicators", &[]).await
    }

    async fn fetch_indicators(&self, ids: &[IndicatorId]) -> Result<Vec<Indicator>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_json("indicators", "indicators", &[("ids", joined(ids))])
            .await
    }

    async fn fetch_records(&self, ids: &[IndicatorId]) -> Result<Vec<MeasurementRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<MeasurementRecord> = self
            .get_json(
                "records",
                "records",
                &[
                    ("indicator_ids", joined(ids)),
                    ("has_period", "true".to_string()),
                ],
            )
            .await?;
        Ok(records)
    }
}
