//! Inference pipeline: loaded artifacts, the stage chain and its results.

mod context;
mod orchestrator;
mod result;

pub use context::ModelContext;
pub use orchestrator::{Orchestrator, PipelineOptions};
pub use result::{FailureKind, PredictionOutcome, PredictionResult, RiskBand};
