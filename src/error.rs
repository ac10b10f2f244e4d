//! Error types for the report engine.

use crate::models::IndicatorId;
use chrono::NaiveDate;
use thiserror::Error;

/// Failures of the fetch, aggregation and analysis steps.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The metadata or record collaborator failed.
    #[error("failed to fetch {what}: {message}")]
    Fetch { what: &'static str, message: String },

    /// A collaborator answered with a payload that does not decode.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The analysis collaborator failed or rejected the request.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// Two records of the same kind share a period and duplicates are rejected.
    #[error("indicator {indicator} has more than one {kind} value for {period}")]
    DuplicateMeasurement {
        indicator: IndicatorId,
        period: NaiveDate,
        kind: crate::models::MeasurementKind,
    },

    /// The session refused the trigger; nothing was sent anywhere.
    #[error(transparent)]
    Rejected(#[from] SessionError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn fetch(what: &'static str, message: impl Into<String>) -> Self {
        EngineError::Fetch {
            what,
            message: message.into(),
        }
    }
}

/// Reasons a session refuses a trigger without doing any work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("select at least {required} indicators to run a comparative analysis ({selected} selected)")]
    InsufficientSelection { selected: usize, required: usize },

    #[error("an analysis is already running")]
    AnalysisInFlight,

    #[error("no report is available for the current selection; fetch the indicator data first")]
    NoReport,
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
