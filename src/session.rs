//! Selection → report → analysis lifecycle.
//!
//! `AnalysisSession` tracks which stage the comparison is in. Fetches are
//! tagged with a generation number so that a slow response for an older
//! selection cannot overwrite newer data, and the analysis call is guarded by
//! a busy flag so that only one runs at a time.
//!
//! Work is split into `begin_*`/`complete_*` pairs for callers that drive the
//! I/O themselves; [`AnalysisSession::refresh`] and
//! [`AnalysisSession::run_analysis`] wrap both halves.

use crate::analysis::{missing_indicators, summarize_all, PeriodAggregator};
use crate::analyst::{AnalysisClient, AnalysisRequest, AnalysisResponse};
use crate::error::{Result, SessionError};
use crate::models::{ComparisonReport, IndicatorId, SelectionTotals};
use crate::report::generate_report_text;
use crate::selection::{SelectionSet, MIN_INDICATORS_FOR_ANALYSIS};
use crate::source::{fetch_selection, FetchedData, IndicatorSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Where the comparison currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Fewer than two indicators selected.
    Insufficient,
    /// Enough indicators selected; a report may or may not be available.
    Ready,
    /// Metadata and records are being fetched.
    Fetching,
    /// The analysis call is in flight.
    Analyzing,
    /// The last analysis succeeded.
    Analyzed,
    /// The last fetch failed.
    Failed,
}

/// Handle for one issued fetch.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    selection: Vec<IndicatorId>,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ids(&self) -> &[IndicatorId] {
        &self.selection
    }
}

/// Whether a completed fetch was applied or discarded as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Stale,
}

/// Handle for the one analysis call allowed in flight.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    request: AnalysisRequest,
    selection: Vec<IndicatorId>,
}

impl AnalysisTicket {
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }
}

/// A finished analysis, ready to be stored by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub prompt_id: String,
    pub indicator_ids: Vec<IndicatorId>,
    /// The exact text that was sent.
    pub payload: String,
    /// The service answer, untouched.
    pub result: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Run aggregation, statistics and formatting over fetched data.
pub fn compile_report(
    selection: &[IndicatorId],
    data: &FetchedData,
    aggregator: &PeriodAggregator,
) -> Result<ComparisonReport> {
    let series = aggregator.aggregate(selection, &data.indicators, &data.records)?;

    let missing = missing_indicators(selection, &series);
    if !missing.is_empty() {
        warn!("{} selected indicator(s) have no data", missing.len());
    }

    let summaries = summarize_all(series);
    let totals = SelectionTotals::from_summaries(&summaries);
    let text = generate_report_text(&summaries);

    Ok(ComparisonReport {
        generated_at: Utc::now(),
        selection: selection.to_vec(),
        summaries,
        totals,
        missing,
        text,
    })
}

/// State machine around one comparison.
#[derive(Debug)]
pub struct AnalysisSession {
    aggregator: PeriodAggregator,
    state: SessionState,
    generation: u64,
    busy: bool,
    report: Option<ComparisonReport>,
    outcome: Option<AnalysisOutcome>,
    last_error: Option<String>,
}

impl AnalysisSession {
    pub fn new(aggregator: PeriodAggregator) -> Self {
        Self {
            aggregator,
            state: SessionState::Insufficient,
            generation: 0,
            busy: false,
            report: None,
            outcome: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Latest successfully built report; kept across failed fetches.
    pub fn report(&self) -> Option<&ComparisonReport> {
        self.report.as_ref()
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record a selection change. Any fetch issued before it becomes stale.
    pub fn selection_changed(&mut self, selection: &SelectionSet) {
        self.generation += 1;
        debug!(
            "Selection changed ({} ids), generation {}",
            selection.len(),
            self.generation
        );
        if !self.busy {
            self.state = idle_state(selection.len());
        }
    }

    /// Issue a fetch for the current selection.
    pub fn begin_fetch(&mut self, selection: &SelectionSet) -> FetchTicket {
        self.generation += 1;
        if !self.busy {
            self.state = SessionState::Fetching;
        }
        FetchTicket {
            generation: self.generation,
            selection: selection.ids().to_vec(),
        }
    }

    /// Apply the result of a fetch unless a newer one has been issued since.
    ///
    /// On failure the previous report is left in place.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<FetchedData>,
    ) -> Result<FetchOutcome> {
        if ticket.generation != self.generation {
            debug!(
                "Discarding fetch of generation {} (latest is {})",
                ticket.generation, self.generation
            );
            return Ok(FetchOutcome::Stale);
        }

        let compiled =
            result.and_then(|data| compile_report(&ticket.selection, &data, &self.aggregator));

        match compiled {
            Ok(report) => {
                info!(
                    "Report ready: {} summaries, {} bytes",
                    report.summaries.len(),
                    report.text.len()
                );
                self.report = Some(report);
                self.last_error = None;
                if !self.busy {
                    self.state = idle_state(ticket.selection.len());
                }
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                warn!("Fetch failed: {}", e);
                self.last_error = Some(e.to_string());
                if !self.busy {
                    self.state = SessionState::Failed;
                }
                Err(e)
            }
        }
    }

    /// Start an analysis of the current report.
    ///
    /// Rejected without side effects when one is already running, when fewer
    /// than two indicators are selected, or when no report matches the selection.
    pub fn begin_analysis(
        &mut self,
        selection: &SelectionSet,
        prompt_id: &str,
    ) -> std::result::Result<AnalysisTicket, SessionError> {
        if self.busy {
            return Err(SessionError::AnalysisInFlight);
        }

        if !selection.can_analyze() {
            return Err(SessionError::InsufficientSelection {
                selected: selection.len(),
                required: MIN_INDICATORS_FOR_ANALYSIS,
            });
        }

        let report = match self.report {
            Some(ref report) if report.selection.as_slice() == selection.ids() => report,
            _ => return Err(SessionError::NoReport),
        };

        let ticket = AnalysisTicket {
            request: AnalysisRequest {
                prompt_id: prompt_id.to_string(),
                text: report.text.clone(),
            },
            selection: report.selection.clone(),
        };

        self.busy = true;
        self.state = SessionState::Analyzing;
        Ok(ticket)
    }

    /// Finish the in-flight analysis and clear the busy flag.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        result: Result<AnalysisResponse>,
    ) -> Result<AnalysisOutcome> {
        self.busy = false;

        match result {
            Ok(response) => {
                let outcome = AnalysisOutcome {
                    prompt_id: ticket.request.prompt_id,
                    indicator_ids: ticket.selection,
                    payload: ticket.request.text,
                    result: response.result,
                    analyzed_at: Utc::now(),
                };
                info!("Analysis complete ({} bytes)", outcome.result.len());
                self.outcome = Some(outcome.clone());
                self.last_error = None;
                self.state = SessionState::Analyzed;
                Ok(outcome)
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                self.last_error = Some(e.to_string());
                self.state = SessionState::Ready;
                Err(e)
            }
        }
    }

    /// Fetch and rebuild the report for `selection`.
    pub async fn refresh(
        &mut self,
        selection: &SelectionSet,
        source: &dyn IndicatorSource,
    ) -> Result<FetchOutcome> {
        let ticket = self.begin_fetch(selection);
        let result = fetch_selection(source, ticket.ids()).await;
        self.complete_fetch(ticket, result)
    }

    /// Send the current report to the analysis service.
    pub async fn run_analysis(
        &mut self,
        selection: &SelectionSet,
        prompt_id: &str,
        analyst: &dyn AnalysisClient,
    ) -> Result<AnalysisOutcome> {
        let ticket = self.begin_analysis(selection, prompt_id)?;
        let result = analyst.analyze(ticket.request()).await;
        self.complete_analysis(ticket, result)
    }
}

fn idle_state(selected: usize) -> SessionState {
    if selected >= MIN_INDICATORS_FOR_ANALYSIS {
        SessionState::Ready
    } else {
        SessionState::Insufficient
    }
}
