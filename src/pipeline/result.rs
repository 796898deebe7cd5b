//! Pipeline output types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, StageError};
use crate::schema::Stage;

/// The three indicators for one job posting.
///
/// Serialized field names follow the response contract
/// (`industry_ai_adoption_stage`, `automation_risk_score`,
/// `ai_job_displacement_risk`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "industry_ai_adoption_stage")]
    pub adoption_stage: String,

    /// Reported automation risk, bounded per the configured `RiskClamp`.
    #[serde(rename = "automation_risk_score")]
    pub automation_risk: f64,

    #[serde(rename = "ai_job_displacement_risk")]
    pub displacement_risk: String,

    /// Regressor output exactly as fed to the displacement stage.
    pub automation_risk_raw: f64,

    pub adoption_probability: f64,

    pub displacement_probability: f64,
}

impl PredictionResult {
    pub fn automation_risk_band(&self) -> RiskBand {
        RiskBand::from_score(self.automation_risk)
    }
}

/// Coarse band of the automation risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    /// `score < 0.33`
    Low,
    /// `0.33 <= score < 0.66`
    Moderate,
    /// `score >= 0.66`
    High,
}

impl RiskBand {
    pub const LOW_UPPER: f64 = 0.33;
    pub const MODERATE_UPPER: f64 = 0.66;

    pub fn from_score(score: f64) -> Self {
        if score < Self::LOW_UPPER {
            RiskBand::Low
        } else if score < Self::MODERATE_UPPER {
            RiskBand::Moderate
        } else {
            RiskBand::High
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            RiskBand::Low => {
                "Low automation risk: this role is relatively safe from automation in the near future."
            }
            RiskBand::Moderate => {
                "Moderate automation risk: consider upskilling in areas that complement AI capabilities."
            }
            RiskBand::High => {
                "High automation risk: develop skills in creative, strategic or interpersonal areas."
            }
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskBand::Low => "low",
            RiskBand::Moderate => "moderate",
            RiskBand::High => "high",
        })
    }
}

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request carried values the models cannot consume.
    InvalidInput,
    /// An augmented row did not match a model's trained columns.
    SchemaMismatch,
    /// A model returned something the pipeline cannot use.
    ModelOutput,
}

/// Tagged result for presentation layers that must never see an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionOutcome {
    Success(PredictionResult),
    Failure {
        stage: Option<Stage>,
        kind: FailureKind,
        message: String,
    },
}

impl PredictionOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success(_))
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            PredictionOutcome::Success(result) => Some(result),
            PredictionOutcome::Failure { .. } => None,
        }
    }
}

impl From<Result<PredictionResult, PipelineError>> for PredictionOutcome {
    fn from(value: Result<PredictionResult, PipelineError>) -> Self {
        match value {
            Ok(result) => PredictionOutcome::Success(result),
            Err(err) => {
                let kind = match &err {
                    PipelineError::Request(_) => FailureKind::InvalidInput,
                    PipelineError::Stage { source, .. } => match source {
                        StageError::Input(_) => FailureKind::InvalidInput,
                        StageError::SchemaMismatch(_) => FailureKind::SchemaMismatch,
                        StageError::OutputCount { .. } | StageError::OutputKind { .. } => FailureKind::ModelOutput,
                    },
                };
                PredictionOutcome::Failure {
                    stage: err.stage(),
                    kind,
                    message: err.to_string(),
                }
            }
        }
    }
}
