//! Error taxonomy.
//!
//! - [`ModelLoadError`]: startup failures. Fatal; the process must not serve.
//! - [`ModelInputError`]: a request the models cannot consume. Recoverable.
//! - [`SchemaMismatchError`]: an augmented row does not line up with what a
//!   stage model was trained on. Fails the request.
//! - [`PipelineError`]: what [`Orchestrator::predict`](crate::Orchestrator::predict)
//!   returns, tagged with the failing stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::InvalidModelError;
use crate::persist::ReadError;
use crate::schema::Stage;

/// Startup failure while loading the feature schema or a stage model.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("{artifact} not found (looked for {})", display_paths(.searched))]
    NotFound {
        artifact: String,
        searched: Vec<PathBuf>,
    },

    #[error("failed to load {artifact} from {}: {source}", .path.display())]
    Read {
        artifact: String,
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("invalid model: {0}")]
    InvalidModel(#[from] InvalidModelError),

    #[error("{stage} model is not wired correctly: {reason}")]
    Wiring { stage: Stage, reason: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ModelLoadError {
    pub(crate) fn wiring(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Wiring {
            stage,
            reason: reason.into(),
        }
    }
}

/// A feature value the stage model cannot encode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelInputError {
    #[error("batch is empty")]
    EmptyBatch,

    #[error("row {row} has no column `{column}`")]
    MissingColumn { row: usize, column: String },

    #[error("row {row}: column `{column}` expects a {expected} value, got {found}")]
    TypeMismatch {
        row: usize,
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("row {row}: `{value}` is not a known category of `{column}`")]
    UnknownCategory {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: column `{column}` is not finite ({value})")]
    NonFinite { row: usize, column: String, value: f64 },

    #[error("row {row}: column `{column}` is absent and absent values are rejected")]
    AbsentValue { row: usize, column: String },

    #[error("invalid `{field}`: {reason}")]
    InvalidParameter { field: String, reason: String },
}

/// A stage received a row whose columns differ from its trained inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} model expects columns [{}], row has [{}]", .expected.join(", "), .actual.join(", "))]
pub struct SchemaMismatchError {
    pub stage: Stage,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

/// Failure of a single stage call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error(transparent)]
    Input(#[from] ModelInputError),

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),

    #[error("model returned {actual} predictions for {expected} rows")]
    OutputCount { expected: usize, actual: usize },

    #[error("model returned a {found} where a {expected} was expected")]
    OutputKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// Failure of a full pipeline call. No partial result is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Request(#[source] ModelInputError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    /// Stage that failed, if the request got that far.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Request(_) => None,
            PipelineError::Stage { stage, .. } => Some(*stage),
        }
    }

    /// Whether the failure is a training/inference column skew.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            PipelineError::Stage {
                source: StageError::SchemaMismatch(_),
                ..
            }
        )
    }
}
