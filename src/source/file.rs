//! JSON dataset source.
//!
//! Serves indicators and records from an exported dataset file of the form
//! `{ "indicators": [...], "records": [...] }`.

use super::IndicatorSource;
use crate::error::{EngineError, Result};
use crate::models::{Indicator, IndicatorId, MeasurementRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Contents of a dataset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub indicators: Vec<Indicator>,
    #[serde(default)]
    pub records: Vec<MeasurementRecord>,
}

/// In-memory source loaded from a dataset file.
#[derive(Debug, Clone)]
pub struct FileSource {
    dataset: Dataset,
}

impl FileSource {
    /// Load a dataset from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dataset: Dataset = serde_json::from_str(&content).map_err(|source| {
            EngineError::Decode {
                what: "dataset file",
                source,
            }
        })?;

        info!(
            "Loaded dataset {} ({} indicators, {} records)",
            path.display(),
            dataset.indicators.len(),
            dataset.records.len()
        );

        Ok(Self { dataset })
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl IndicatorSource for FileSource {
    async fn list_indicators(&self) -> Result<Vec<Indicator>> {
        Ok(self.dataset.indicators.clone())
    }

    async fn fetch_indicators(&self, ids: &[IndicatorId]) -> Result<Vec<Indicator>> {
        let wanted: HashSet<&IndicatorId> = ids.iter().collect();
        Ok(self
            .dataset
            .indicators
            .iter()
            .filter(|i| wanted.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn fetch_records(&self, ids: &[IndicatorId]) -> Result<Vec<MeasurementRecord>> {
        let wanted: HashSet<&IndicatorId> = ids.iter().collect();
        let records: Vec<MeasurementRecord> = self
            .dataset
            .records
            .iter()
            .filter(|r| wanted.contains(&r.indicator_id) && r.period.is_some())
            .cloned()
            .collect();

        debug!("Dataset returned {} dated records", records.len());
        Ok(records)
    }
}
