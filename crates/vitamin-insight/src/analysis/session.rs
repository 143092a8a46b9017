use super::{AnalysisError, AnalysisOutcome, AnalysisPipeline, AnalysisRequest};
use crate::report::RenderableReport;
use crate::visual::{HeatmapFilter, VisualArtifact};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Analyzing,
    Reported,
}

impl SessionState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Analyzing => "Analyzing",
            Self::Reported => "Reported",
        }
    }
}

/// Issued by [`AnalysisSession::begin`]; only the latest ticket may publish.
#[derive(Debug)]
#[must_use]
pub struct AnalysisTicket {
    generation: u64,
    previous: SessionState,
}

/// Per-user analysis state owned by the presentation layer.
///
/// Results are published by swapping in a freshly built outcome, so readers
/// observe either the previous report or the new one, never a mix. A failed
/// analysis leaves the previous report and state in place.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    state: SessionState,
    detail_visible: bool,
    symptoms_visible: bool,
    generation: u64,
    current: Option<Arc<AnalysisOutcome>>,
    analyzed_at: Option<DateTime<Utc>>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            detail_visible: false,
            symptoms_visible: true,
            generation: 0,
            current: None,
            analyzed_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn detail_visible(&self) -> bool {
        self.detail_visible
    }

    /// Flips the detail panel flag; independent of the analysis state.
    pub fn toggle_detail(&mut self) -> bool {
        self.detail_visible = !self.detail_visible;
        self.detail_visible
    }

    pub fn symptoms_visible(&self) -> bool {
        self.symptoms_visible
    }

    /// Symptom insights are shown by default and apply to every report view
    /// this session hands out.
    pub fn set_symptoms_visible(&mut self, visible: bool) {
        self.symptoms_visible = visible;
    }

    pub fn toggle_symptoms(&mut self) -> bool {
        self.symptoms_visible = !self.symptoms_visible;
        self.symptoms_visible
    }

    /// The current report as it should be displayed, honoring the symptom toggle.
    pub fn report_view(&self) -> Option<RenderableReport> {
        self.current.as_ref().map(|outcome| {
            if self.symptoms_visible {
                outcome.view.clone()
            } else {
                outcome.view.clone().hide_symptoms()
            }
        })
    }

    pub fn current(&self) -> Option<&Arc<AnalysisOutcome>> {
        self.current.as_ref()
    }

    pub fn begin(&mut self) -> AnalysisTicket {
        self.generation += 1;
        let previous = match self.state {
            // a superseded run never reached a terminal state
            SessionState::Analyzing if self.current.is_some() => SessionState::Reported,
            SessionState::Analyzing => SessionState::Idle,
            other => other,
        };
        self.state = SessionState::Analyzing;
        AnalysisTicket {
            generation: self.generation,
            previous,
        }
    }

    pub fn finish(
        &mut self,
        ticket: AnalysisTicket,
        result: Result<AnalysisOutcome, AnalysisError>,
    ) -> Result<Arc<AnalysisOutcome>, AnalysisError> {
        if ticket.generation != self.generation {
            return Err(AnalysisError::Superseded);
        }

        match result {
            Ok(outcome) => {
                let outcome = Arc::new(outcome);
                self.current = Some(Arc::clone(&outcome));
                self.analyzed_at = Some(Utc::now());
                self.state = SessionState::Reported;
                Ok(outcome)
            }
            Err(err) => {
                self.state = ticket.previous;
                Err(err)
            }
        }
    }

    /// Gives up on `ticket` without a result, e.g. after a timeout.
    pub fn abandon(&mut self, ticket: AnalysisTicket) {
        if ticket.generation == self.generation {
            self.state = ticket.previous;
        }
    }

    pub fn analyze(
        &mut self,
        pipeline: &AnalysisPipeline,
        bytes: &[u8],
        request: &AnalysisRequest,
    ) -> Result<Arc<AnalysisOutcome>, AnalysisError> {
        let ticket = self.begin();
        let result = pipeline.run(bytes, request);
        self.finish(ticket, result)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            state_label: self.state.label(),
            detail_visible: self.detail_visible,
            symptoms_visible: self.symptoms_visible,
            analyzed_at: self.analyzed_at,
            report: self.report_view(),
            heatmap: self
                .current
                .as_ref()
                .map(|outcome| HeatmapSummary::from(&outcome.artifact)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapSummary {
    pub filter: HeatmapFilter,
    pub width: u32,
    pub height: u32,
}

impl From<&VisualArtifact> for HeatmapSummary {
    fn from(artifact: &VisualArtifact) -> Self {
        Self {
            filter: artifact.filter(),
            width: artifact.width(),
            height: artifact.height(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub state_label: &'static str,
    pub detail_visible: bool,
    pub symptoms_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RenderableReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<HeatmapSummary>,
}
