//! Data models for the indicator report engine.
//!
//! This module contains the reference data handed over by the storage
//! collaborator (indicators and raw measurement records) and the derived
//! structures built fresh on every aggregation run.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an indicator.
///
/// The storage layer hands out numeric ids in some deployments and string
/// keys in others; both deserialize into the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IndicatorId(String);

impl IndicatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IndicatorId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<String> for IndicatorId {
    fn from(s: String) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<i64> for IndicatorId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for IndicatorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(IndicatorId::from)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
            StringOrNumber::Text(s) => s,
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

/// Indicator reference data, owned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    /// Unique identifier.
    pub id: IndicatorId,
    /// Display name used as the report section header.
    #[serde(alias = "indicador")]
    pub name: String,
    /// Owning project, if any.
    #[serde(
        default,
        alias = "projeto_id",
        alias = "projectRef",
        deserialize_with = "optional_string_or_number"
    )]
    pub project_ref: Option<String>,
    /// Owning category, if any.
    #[serde(
        default,
        alias = "categoria_id",
        alias = "categoryRef",
        deserialize_with = "optional_string_or_number"
    )]
    pub category_ref: Option<String>,
}

impl Indicator {
    /// Creates an indicator with no project or category reference.
    pub fn new(id: impl Into<IndicatorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            project_ref: None,
            category_ref: None,
        }
    }
}

/// Whether a measurement is an achieved value or a target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Achieved,
    Target,
}

impl MeasurementKind {
    /// Numeric code used by the storage layer (1 = achieved, 2 = target).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(MeasurementKind::Achieved),
            2 => Some(MeasurementKind::Target),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "achieved" | "realizado" | "1" => Some(MeasurementKind::Achieved),
            "target" | "meta" | "2" => Some(MeasurementKind::Target),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementKind::Achieved => write!(f, "Achieved"),
            MeasurementKind::Target => write!(f, "Target"),
        }
    }
}

impl<'de> Deserialize<'de> for MeasurementKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => MeasurementKind::from_code(code)
                .ok_or_else(|| de::Error::custom(format!("unknown measurement kind code {code}"))),
            Repr::Name(name) => MeasurementKind::from_name(&name)
                .ok_or_else(|| de::Error::custom(format!("unknown measurement kind '{name}'"))),
        }
    }
}

/// Loosely typed measurement value: a number or a numeric-looking string.
///
/// Interpretation as a number happens in exactly one place,
/// [`crate::analysis::parse_numeric_or_zero`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Number(f64),
    Text(String),
    /// Any other JSON value (booleans, arrays, objects), kept as stored.
    Other(serde_json::Value),
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Number(n) => write!(f, "{}", n),
            MeasurementValue::Text(s) => f.write_str(s),
            MeasurementValue::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for MeasurementValue {
    fn from(n: f64) -> Self {
        MeasurementValue::Number(n)
    }
}

impl From<i32> for MeasurementValue {
    fn from(n: i32) -> Self {
        MeasurementValue::Number(f64::from(n))
    }
}

impl From<&str> for MeasurementValue {
    fn from(s: &str) -> Self {
        MeasurementValue::Text(s.to_string())
    }
}

impl From<String> for MeasurementValue {
    fn from(s: String) -> Self {
        MeasurementValue::Text(s)
    }
}

/// One dated observation of an indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Indicator this record belongs to.
    #[serde(alias = "id_controleindicador", alias = "indicatorId")]
    pub indicator_id: IndicatorId,
    /// Reference date. Records without one are dropped before aggregation.
    #[serde(
        default,
        alias = "periodo_referencia",
        deserialize_with = "deserialize_period"
    )]
    pub period: Option<NaiveDate>,
    /// Achieved or target.
    #[serde(alias = "tipo_indicador")]
    pub kind: MeasurementKind,
    /// Raw value as stored.
    #[serde(default, alias = "valor_indicador_apresentado")]
    pub value: Option<MeasurementValue>,
}

impl MeasurementRecord {
    /// Creates a record with a period and a value.
    pub fn new(
        indicator_id: impl Into<IndicatorId>,
        period: NaiveDate,
        kind: MeasurementKind,
        value: impl Into<MeasurementValue>,
    ) -> Self {
        Self {
            indicator_id: indicator_id.into(),
            period: Some(period),
            kind,
            value: Some(value.into()),
        }
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive timestamps; keeps the date.
fn deserialize_period<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) => raw,
        None => return Ok(None),
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    parse_period(raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid period '{raw}'")))
}

/// Parses a period string into a calendar date.
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.date())
}

/// The achieved/target pair of one indicator for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedPeriod {
    pub period: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achieved: Option<MeasurementValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<MeasurementValue>,
}

impl AggregatedPeriod {
    /// Creates an empty bucket for a period.
    pub fn new(period: NaiveDate) -> Self {
        Self {
            period,
            achieved: None,
            target: None,
        }
    }

    /// Returns the value stored for a kind.
    pub fn value(&self, kind: MeasurementKind) -> Option<&MeasurementValue> {
        match kind {
            MeasurementKind::Achieved => self.achieved.as_ref(),
            MeasurementKind::Target => self.target.as_ref(),
        }
    }

    /// Stores a value for a kind, replacing whatever was there.
    pub fn set(&mut self, kind: MeasurementKind, value: Option<MeasurementValue>) {
        match kind {
            MeasurementKind::Achieved => self.achieved = value,
            MeasurementKind::Target => self.target = value,
        }
    }
}

/// Aggregator output for one indicator: periods populated, no statistics yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSeries {
    /// Indicator metadata.
    pub indicator: Indicator,
    /// Periods in ascending chronological order.
    pub periods: Vec<AggregatedPeriod>,
    /// Number of qualifying raw records behind the periods.
    pub record_count: usize,
}

/// Aggregated and statistically reduced view of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSummary {
    /// Indicator metadata.
    pub indicator: Indicator,
    /// Periods in ascending chronological order.
    pub periods: Vec<AggregatedPeriod>,
    /// Number of qualifying raw records (both kinds).
    pub record_count: usize,
    /// Periods carrying an achieved value.
    pub achieved_count: usize,
    /// Periods carrying a target value.
    pub target_count: usize,
    /// Sum of coerced achieved values.
    pub sum_achieved: f64,
    /// Sum of coerced target values.
    pub sum_target: f64,
    /// Mean achieved value, `0` when there is none.
    pub mean_achieved: f64,
    /// Mean target value, `0` when there is none.
    pub mean_target: f64,
    /// Earliest period across both kinds.
    pub first_period: NaiveDate,
    /// Latest period across both kinds.
    pub last_period: NaiveDate,
}

impl IndicatorSummary {
    /// Number of distinct periods.
    pub fn unique_periods(&self) -> usize {
        self.periods.len()
    }
}

/// Selection-wide totals shown alongside the per-indicator summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionTotals {
    pub indicators: usize,
    pub records: usize,
    pub achieved: usize,
    pub targets: usize,
    pub sum_achieved: f64,
    pub sum_target: f64,
}

impl SelectionTotals {
    /// Adds up the per-indicator summaries.
    pub fn from_summaries(summaries: &[IndicatorSummary]) -> Self {
        summaries.iter().fold(Self::default(), |mut totals, summary| {
            totals.indicators += 1;
            totals.records += summary.record_count;
            totals.achieved += summary.achieved_count;
            totals.targets += summary.target_count;
            totals.sum_achieved += summary.sum_achieved;
            totals.sum_target += summary.sum_target;
            totals
        })
    }
}

/// Everything one aggregation run produced, including the analysis payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// When the run finished. Not part of the payload text.
    pub generated_at: DateTime<Utc>,
    /// Selection the run was computed for, in order.
    pub selection: Vec<IndicatorId>,
    /// One summary per selected indicator with data, in selection order.
    pub summaries: Vec<IndicatorSummary>,
    /// Totals across all summaries.
    pub totals: SelectionTotals,
    /// Selected indicators without any dated record.
    pub missing: Vec<IndicatorId>,
    /// Rendered text handed to the analysis service.
    pub text: String,
}
