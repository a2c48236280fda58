//! Errors surfaced by the annotation pipelines.

use std::fmt;

use crate::fanout::TaskFailure;
use crate::oracle::OracleError;

/// Pipeline step that issued a failing oracle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InduceCategories,
    AssignAttributes,
    AssignColors,
    RateScenes,
    AskQuestion,
    FindChapter,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::InduceCategories => "induce_categories",
            Stage::AssignAttributes => "assign_attributes",
            Stage::AssignColors => "assign_colors",
            Stage::RateScenes => "rate_scenes",
            Stage::AskQuestion => "ask_question",
            Stage::FindChapter => "find_chapter",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    /// A single-call stage failed.
    #[error("{stage} failed: {source}")]
    Oracle {
        stage: Stage,
        #[source]
        source: OracleError,
    },

    /// One or more calls of a fan-out stage failed. Indices are positions in
    /// submission order (batch index or scene index).
    #[error("{stage} failed for {} of {total} tasks (indices {})", .failures.len(), failure_indices(.failures))]
    FanOut {
        stage: Stage,
        total: usize,
        failures: Vec<TaskFailure<OracleError>>,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AnnotateError {
    pub fn oracle(stage: Stage) -> impl FnOnce(OracleError) -> Self {
        move |source| AnnotateError::Oracle { stage, source }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        AnnotateError::InvalidInput(message.into())
    }

    /// Indices of failed tasks, empty for non fan-out errors.
    pub fn failed_indices(&self) -> Vec<usize> {
        match self {
            AnnotateError::FanOut { failures, .. } => failures.iter().map(|f| f.index).collect(),
            _ => Vec::new(),
        }
    }
}

fn failure_indices(failures: &[TaskFailure<OracleError>]) -> String {
    failures
        .iter()
        .map(|f| f.index.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
