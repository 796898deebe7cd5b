//! jobimpact: chained gradient-boosted inference for AI labor-market indicators.
//!
//! Three stage models run in a fixed order over one job posting:
//!
//! 1. **adoption** classifies the industry's AI adoption stage,
//! 2. **automation** regresses an automation risk score, reading the
//!    predicted adoption stage,
//! 3. **displacement** classifies the job displacement risk, reading both
//!    previous predictions.
//!
//! ```no_run
//! use jobimpact::{JobPosting, Orchestrator, PipelineConfig};
//!
//! let config = PipelineConfig::from_env()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let result = orchestrator.predict_posting(&JobPosting::default())?;
//! println!("{} / {:.2} / {}", result.adoption_stage, result.automation_risk, result.displacement_risk);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod repr;
pub mod request;
pub mod row;
pub mod schema;
pub mod testing;

pub use config::{AbsentPolicy, ConfigError, PipelineConfig, RiskClamp};
pub use error::{ModelInputError, ModelLoadError, PipelineError, SchemaMismatchError, StageError};
pub use model::{ForestStageModel, PredictionValue, StageModel, TaskKind};
pub use pipeline::{
    FailureKind, ModelContext, Orchestrator, PipelineOptions, PredictionOutcome, PredictionResult, RiskBand,
};
pub use request::JobPosting;
pub use row::{FeatureRow, FeatureValue, RawParams};
pub use schema::{FeatureSchema, Stage, ADOPTION_STAGE_COLUMN, AUTOMATION_RISK_COLUMN};
