//! Chained three-stage inference.
//!
//! ```text
//! raw params ─▶ base row ─▶ adoption ─▶ + industry_ai_adoption_stage
//!                                     ─▶ automation ─▶ + automation_risk_score
//!                                                   ─▶ displacement ─▶ result
//! ```
//!
//! Each stage is a function `rows -> (values, augmented rows)`. The order is
//! fixed: a stage always sees the predicted outputs of every stage before it,
//! never caller-supplied values.

use std::sync::Arc;

use crate::config::{AbsentPolicy, PipelineConfig, RiskClamp};
use crate::error::{ModelInputError, ModelLoadError, PipelineError, SchemaMismatchError, StageError};
use crate::model::PredictionValue;
use crate::request::JobPosting;
use crate::row::{FeatureRow, RawParams};
use crate::schema::{Stage, DERIVED_COLUMNS, DISPLACEMENT_RISK_COLUMN};

use super::context::ModelContext;
use super::result::{PredictionOutcome, PredictionResult};

/// Per-request behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineOptions {
    pub risk_clamp: RiskClamp,
    pub absent_policy: AbsentPolicy,
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            risk_clamp: config.risk_clamp,
            absent_policy: config.absent_policy,
        }
    }
}

/// Runs the adoption → automation → displacement chain.
///
/// Cheap to clone; clones share the loaded models.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    context: Arc<ModelContext>,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(context: impl Into<Arc<ModelContext>>, options: PipelineOptions) -> Self {
        Self {
            context: context.into(),
            options,
        }
    }

    /// Load the models named by `config` and build an orchestrator.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ModelLoadError> {
        let context = ModelContext::load(config)?;
        Ok(Self::new(context, config.into()))
    }

    /// Configure from `JOBIMPACT_*` environment variables and load the models.
    pub fn from_env() -> Result<Self, ModelLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ModelLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = PipelineConfig::from_lookup(lookup)?;
        Self::from_config(&config)
    }

    #[inline]
    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    #[inline]
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Project raw parameters onto the schema.
    ///
    /// Keys outside the schema are dropped, including any that name a derived
    /// column; those are only ever produced by the models.
    pub fn base_row(&self, params: &RawParams) -> FeatureRow {
        let schema = self.context.schema();
        for key in params.keys() {
            if DERIVED_COLUMNS.contains(&key.as_str()) || key == DISPLACEMENT_RISK_COLUMN {
                tracing::debug!(key = %key, "ignoring caller-supplied derived column");
            } else if !schema.contains(key) {
                tracing::debug!(key = %key, "ignoring parameter outside the feature schema");
            }
        }
        FeatureRow::project(schema, params)
    }

    /// Predict all three indicators for one request.
    pub fn predict(&self, params: &RawParams) -> Result<PredictionResult, PipelineError> {
        let mut results = self.predict_batch(std::slice::from_ref(params))?;
        results.pop().ok_or(PipelineError::Request(ModelInputError::EmptyBatch))
    }

    /// [`predict`](Self::predict) folded into a tagged outcome. Never fails.
    pub fn predict_outcome(&self, params: &RawParams) -> PredictionOutcome {
        self.predict(params).into()
    }

    /// Validate a typed posting, then predict.
    pub fn predict_posting(&self, posting: &JobPosting) -> Result<PredictionResult, PipelineError> {
        posting.validate().map_err(PipelineError::Request)?;
        self.predict(&posting.to_params())
    }

    /// Predict many requests, stage by stage.
    ///
    /// Equivalent to calling [`predict`](Self::predict) per request, except
    /// that the first failing row fails the whole batch.
    pub fn predict_batch(&self, batch: &[RawParams]) -> Result<Vec<PredictionResult>, PipelineError> {
        if batch.is_empty() {
            return Err(PipelineError::Request(ModelInputError::EmptyBatch));
        }
        let _span = tracing::debug_span!("predict", rows = batch.len()).entered();

        let rows: Vec<FeatureRow> = batch.iter().map(|p| self.base_row(p)).collect();
        if self.options.absent_policy == AbsentPolicy::Reject {
            check_no_absent(&rows)?;
        }

        let (adoption, rows) = self.run_stage(Stage::Adoption, &rows)?;
        let (automation, rows) = self.run_stage(Stage::Automation, &rows)?;
        let (displacement, _) = self.run_stage(Stage::Displacement, &rows)?;

        let results = adoption
            .into_iter()
            .zip(automation)
            .zip(displacement)
            .map(|((a, r), d)| self.assemble(a, r, d))
            .collect::<Result<Vec<_>, _>>()?;

        for result in &results {
            tracing::debug!(
                adoption = %result.adoption_stage,
                automation_raw = result.automation_risk_raw,
                displacement = %result.displacement_risk,
                "prediction"
            );
        }
        Ok(results)
    }

    /// Check, predict and augment one stage.
    fn run_stage(
        &self,
        stage: Stage,
        rows: &[FeatureRow],
    ) -> Result<(Vec<PredictionValue>, Vec<FeatureRow>), PipelineError> {
        let fail = |source: StageError| PipelineError::Stage { stage, source };
        let model = self.context.model(stage);

        let expected = model.input_columns();
        for row in rows {
            if row.names() != expected {
                let err = SchemaMismatchError {
                    stage,
                    expected: expected.to_vec(),
                    actual: row.names().to_vec(),
                };
                tracing::error!(
                    stage = %stage,
                    expected = ?err.expected,
                    actual = ?err.actual,
                    "feature row does not match model columns"
                );
                return Err(fail(err.into()));
            }
        }

        let values = model.predict(rows).map_err(fail)?;
        if values.len() != rows.len() {
            return Err(fail(StageError::OutputCount {
                expected: rows.len(),
                actual: values.len(),
            }));
        }

        let wanted = if stage.is_classifier() { "class label" } else { "score" };
        if let Some(bad) = values.iter().find(|v| v.kind() != wanted) {
            return Err(fail(StageError::OutputKind {
                expected: wanted,
                found: bad.kind(),
            }));
        }

        let augmented = if stage == Stage::Displacement {
            Vec::new()
        } else {
            rows.iter()
                .zip(&values)
                .map(|(row, value)| row.with_column(stage.output_column(), value.to_feature()))
                .collect()
        };
        tracing::trace!(stage = %stage, rows = rows.len(), "stage complete");
        Ok((values, augmented))
    }

    fn assemble(
        &self,
        adoption: PredictionValue,
        automation: PredictionValue,
        displacement: PredictionValue,
    ) -> Result<PredictionResult, PipelineError> {
        let class = |stage: Stage, value: PredictionValue| match value {
            PredictionValue::Class { label, probability } => Ok((label, probability)),
            other => Err(PipelineError::Stage {
                stage,
                source: StageError::OutputKind {
                    expected: "class label",
                    found: other.kind(),
                },
            }),
        };
        let (adoption_stage, adoption_probability) = class(Stage::Adoption, adoption)?;
        let (displacement_risk, displacement_probability) = class(Stage::Displacement, displacement)?;
        let raw = automation.as_score().ok_or(PipelineError::Stage {
            stage: Stage::Automation,
            source: StageError::OutputKind {
                expected: "score",
                found: automation.kind(),
            },
        })?;

        Ok(PredictionResult {
            adoption_stage,
            automation_risk: self.options.risk_clamp.apply(raw),
            displacement_risk,
            automation_risk_raw: raw,
            adoption_probability,
            displacement_probability,
        })
    }
}

fn check_no_absent(rows: &[FeatureRow]) -> Result<(), PipelineError> {
    for (row_idx, row) in rows.iter().enumerate() {
        if let Some(column) = row.absent_columns().next() {
            tracing::debug!(row = row_idx, column, "rejecting absent value");
            return Err(PipelineError::Request(ModelInputError::AbsentValue {
                row: row_idx,
                column: column.to_string(),
            }));
        }
    }
    Ok(())
}
