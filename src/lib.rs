//! indicator-report - comparative reports over indicator time series
//!
//! Takes a user-chosen set of indicators, aligns their achieved and target
//! measurements per reference period, computes per-indicator statistics and
//! renders a plain-text comparison that can be sent to an analysis service.

pub mod analysis;
pub mod analyst;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod selection;
pub mod session;
pub mod source;

pub use analysis::{DuplicatePolicy, PeriodAggregator};
pub use error::{EngineError, Result, SessionError};
pub use models::{
    ComparisonReport, Indicator, IndicatorId, IndicatorSummary, MeasurementKind,
    MeasurementRecord, MeasurementValue, SelectionTotals,
};
pub use selection::SelectionSet;
pub use session::{compile_report, AnalysisOutcome, AnalysisSession, FetchOutcome, SessionState};
