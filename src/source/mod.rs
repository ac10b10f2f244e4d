//! Indicator metadata and measurement record collaborators.
//!
//! The engine never owns storage. A source answers two read-only queries for
//! a set of indicator ids; both are issued together on every refresh.

pub mod file;
pub mod http;

pub use file::{Dataset, FileSource};
pub use http::HttpSource;

use crate::error::Result;
use crate::models::{Indicator, IndicatorId, MeasurementRecord};
use async_trait::async_trait;
use tracing::info;

/// Read-only access to indicators and their records.
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    /// Every indicator the caller can choose from.
    async fn list_indicators(&self) -> Result<Vec<Indicator>>;

    /// Metadata for the given ids. Unknown ids are simply absent.
    async fn fetch_indicators(&self, ids: &[IndicatorId]) -> Result<Vec<Indicator>>;

    /// All dated records of the given indicators.
    async fn fetch_records(&self, ids: &[IndicatorId]) -> Result<Vec<MeasurementRecord>>;
}

/// Metadata and records fetched for one selection.
#[derive(Debug, Clone, Default)]
pub struct FetchedData {
    pub indicators: Vec<Indicator>,
    pub records: Vec<MeasurementRecord>,
}

/// Fetch metadata and records concurrently; either failure fails the whole fetch.
pub async fn fetch_selection(
    source: &dyn IndicatorSource,
    ids: &[IndicatorId],
) -> Result<FetchedData> {
    let (indicators, records) =
        futures::try_join!(source.fetch_indicators(ids), source.fetch_records(ids))?;

    info!(
        "Fetched {} indicators and {} records for {} selected ids",
        indicators.len(),
        records.len(),
        ids.len()
    );

    Ok(FetchedData {
        indicators,
        records,
    })
}
