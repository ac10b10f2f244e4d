//! Period aggregation.
//!
//! This module partitions raw measurement records by indicator and pairs the
//! achieved and target values of each indicator per period.

use crate::error::{EngineError, Result};
use crate::models::{
    AggregatedPeriod, Indicator, IndicatorId, MeasurementKind, MeasurementRecord, PeriodSeries,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// What to do when two records of the same kind land on the same period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The record that comes later in the input overwrites the earlier one.
    #[default]
    LastWriteWins,
    /// Fail the run with [`EngineError::DuplicateMeasurement`].
    Reject,
}

/// Groups records into per-indicator, per-period achieved/target pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodAggregator {
    duplicates: DuplicatePolicy,
}

impl PeriodAggregator {
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self { duplicates }
    }

    /// Aggregate the records of the selected indicators.
    ///
    /// Output follows selection order. Selected indicators without any dated
    /// record, or without metadata, produce no series at all.
    pub fn aggregate(
        &self,
        selection: &[IndicatorId],
        indicators: &[Indicator],
        records: &[MeasurementRecord],
    ) -> Result<Vec<PeriodSeries>> {
        let metadata: HashMap<&IndicatorId, &Indicator> =
            indicators.iter().map(|i| (&i.id, i)).collect();
        let partitions = partition_by_indicator(selection, records);

        let mut seen = HashSet::new();
        let mut series = Vec::with_capacity(partitions.len());

        for id in selection {
            if !seen.insert(id) {
                continue;
            }

            let Some(indicator_records) = partitions.get(id) else {
                debug!("Indicator {} has no dated records", id);
                continue;
            };

            let Some(indicator) = metadata.get(id) else {
                warn!(
                    "Skipping indicator {}: {} records but no metadata",
                    id,
                    indicator_records.len()
                );
                continue;
            };

            let periods = self.bucket_by_period(id, indicator_records)?;
            debug!(
                "Indicator {} aggregated into {} periods from {} records",
                id,
                periods.len(),
                indicator_records.len()
            );

            series.push(PeriodSeries {
                indicator: (*indicator).clone(),
                periods,
                record_count: indicator_records.len(),
            });
        }

        Ok(series)
    }

    /// Bucket one indicator's records by exact period, ascending.
    fn bucket_by_period(
        &self,
        id: &IndicatorId,
        records: &[&MeasurementRecord],
    ) -> Result<Vec<AggregatedPeriod>> {
        let mut buckets: BTreeMap<NaiveDate, AggregatedPeriod> = BTreeMap::new();
        let mut filled: HashSet<(NaiveDate, MeasurementKind)> = HashSet::new();

        for record in records {
            let Some(period) = record.period else {
                continue;
            };

            if !filled.insert((period, record.kind)) {
                match self.duplicates {
                    DuplicatePolicy::LastWriteWins => {
                        debug!(
                            "Indicator {}: later {} value for {} overwrites the earlier one",
                            id, record.kind, period
                        );
                    }
                    DuplicatePolicy::Reject => {
                        return Err(EngineError::DuplicateMeasurement {
                            indicator: id.clone(),
                            period,
                            kind: record.kind,
                        });
                    }
                }
            }

            buckets
                .entry(period)
                .or_insert_with(|| AggregatedPeriod::new(period))
                .set(record.kind, record.value.clone());
        }

        Ok(buckets.into_values().collect())
    }
}

/// Partition dated records of selected indicators, keeping input order within each.
fn partition_by_indicator<'a>(
    selection: &[IndicatorId],
    records: &'a [MeasurementRecord],
) -> HashMap<&'a IndicatorId, Vec<&'a MeasurementRecord>> {
    let selected: HashSet<&IndicatorId> = selection.iter().collect();
    let mut partitions: HashMap<&IndicatorId, Vec<&MeasurementRecord>> = HashMap::new();
    let mut undated = 0usize;

    for record in records {
        if !selected.contains(&record.indicator_id) {
            continue;
        }
        if record.period.is_none() {
            undated += 1;
            continue;
        }
        partitions
            .entry(&record.indicator_id)
            .or_default()
            .push(record);
    }

    if undated > 0 {
        debug!("Dropped {} records without a period", undated);
    }

    partitions
}

/// Selected indicators that produced no series.
pub fn missing_indicators(selection: &[IndicatorId], series: &[PeriodSeries]) -> Vec<IndicatorId> {
    let present: HashSet<&IndicatorId> = series.iter().map(|s| &s.indicator.id).collect();
    selection
        .iter()
        .filter(|id| !present.contains(id))
        .cloned()
        .collect()
}
