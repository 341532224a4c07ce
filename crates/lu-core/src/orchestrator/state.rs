//! Observable analysis state

use crate::boundary::Boundary;
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, BuiltUpResult, EncroachmentResult};
use serde::Serialize;
use tokio::task::JoinHandle;

/// Pipeline stage an analysis can fail in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    #[serde(rename = "VALIDATING")]
    Validating,
    #[serde(rename = "DETECTING_BUILTUP")]
    DetectingBuiltUp,
    #[serde(rename = "DETECTING_ENCROACHMENT")]
    DetectingEncroachment,
    #[serde(rename = "SCORING")]
    Scoring,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Validating => write!(f, "VALIDATING"),
            Stage::DetectingBuiltUp => write!(f, "DETECTING_BUILTUP"),
            Stage::DetectingEncroachment => write!(f, "DETECTING_ENCROACHMENT"),
            Stage::Scoring => write!(f, "SCORING"),
        }
    }
}

/// What a presenter sees.
///
/// Every non-idle variant carries the generation of the analysis that wrote
/// it along with whatever that analysis has accumulated so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state")]
pub enum AnalysisState {
    #[serde(rename = "IDLE")]
    Idle,

    #[serde(rename = "VALIDATING")]
    Validating { generation: u64 },

    #[serde(rename = "DETECTING_BUILTUP")]
    DetectingBuiltUp { generation: u64, boundary: Boundary },

    #[serde(rename = "DETECTING_ENCROACHMENT")]
    DetectingEncroachment {
        generation: u64,
        boundary: Boundary,
        built_up: BuiltUpResult,
    },

    #[serde(rename = "SCORING")]
    Scoring {
        generation: u64,
        boundary: Boundary,
        built_up: BuiltUpResult,
        encroachment: EncroachmentResult,
    },

    #[serde(rename = "COMPLETE")]
    Complete {
        generation: u64,
        result: AnalysisResult,
    },

    #[serde(rename = "FAILED")]
    Failed {
        generation: u64,
        stage: Stage,
        error: AnalysisError,
    },
}

impl AnalysisState {
    pub fn generation(&self) -> u64 {
        match self {
            AnalysisState::Idle => 0,
            AnalysisState::Validating { generation }
            | AnalysisState::DetectingBuiltUp { generation, .. }
            | AnalysisState::DetectingEncroachment { generation, .. }
            | AnalysisState::Scoring { generation, .. }
            | AnalysisState::Complete { generation, .. }
            | AnalysisState::Failed { generation, .. } => *generation,
        }
    }

    /// Stage in progress, or the stage that failed
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnalysisState::Idle | AnalysisState::Complete { .. } => None,
            AnalysisState::Validating { .. } => Some(Stage::Validating),
            AnalysisState::DetectingBuiltUp { .. } => Some(Stage::DetectingBuiltUp),
            AnalysisState::DetectingEncroachment { .. } => Some(Stage::DetectingEncroachment),
            AnalysisState::Scoring { .. } => Some(Stage::Scoring),
            AnalysisState::Failed { stage, .. } => Some(*stage),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisState::Complete { .. } | AnalysisState::Failed { .. }
        )
    }

    pub fn is_in_flight(&self) -> bool {
        !matches!(self, AnalysisState::Idle) && !self.is_terminal()
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisState::Idle => "IDLE",
            AnalysisState::Validating { .. } => "VALIDATING",
            AnalysisState::DetectingBuiltUp { .. } => "DETECTING_BUILTUP",
            AnalysisState::DetectingEncroachment { .. } => "DETECTING_ENCROACHMENT",
            AnalysisState::Scoring { .. } => "SCORING",
            AnalysisState::Complete { .. } => "COMPLETE",
            AnalysisState::Failed { .. } => "FAILED",
        }
    }
}

/// How one analysis ended, as seen by whoever started it
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Complete(AnalysisResult),
    Failed { stage: Stage, error: AnalysisError },
    /// A newer submission took over; nothing from this run was published
    Superseded { generation: u64 },
}

impl AnalysisOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, AnalysisOutcome::Complete(_))
    }
}

/// Handle to a spawned analysis
#[derive(Debug)]
pub struct Submission {
    pub generation: u64,
    pub handle: JoinHandle<AnalysisOutcome>,
}
