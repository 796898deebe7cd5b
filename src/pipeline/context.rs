//! Loaded artifacts for the lifetime of the process.

use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::encoding::FeatureEncoding;
use crate::error::ModelLoadError;
use crate::model::StageModel;
use crate::persist;
use crate::schema::{FeatureSchema, Stage, ADOPTION_STAGE_COLUMN, AUTOMATION_RISK_COLUMN};

/// Feature schema plus the three stage models, validated to fit together.
///
/// Immutable after construction. Share it across threads with `Arc`.
#[derive(Debug)]
pub struct ModelContext {
    schema: FeatureSchema,
    models: [Box<dyn StageModel>; 3],
}

impl ModelContext {
    /// Load every artifact named by `config` and validate the wiring.
    ///
    /// This is the only place the pipeline touches the filesystem.
    pub fn load(config: &PipelineConfig) -> Result<Self, ModelLoadError> {
        let _span = tracing::info_span!("load_models", dir = %config.model_dir.display()).entered();

        let path = locate("feature schema", config.feature_columns_paths())?;
        let schema = persist::load_feature_schema(&path).map_err(|source| ModelLoadError::Read {
            artifact: "feature schema".to_string(),
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), columns = schema.len(), "loaded feature schema");

        let load = |stage: Stage| -> Result<Box<dyn StageModel>, ModelLoadError> {
            let artifact = format!("{stage} model");
            let path = locate(&artifact, config.stage_model_paths(stage))?;
            let model = persist::load_stage_model(&path).map_err(|source| ModelLoadError::Read {
                artifact,
                path: path.clone(),
                source,
            })?;
            tracing::info!(
                stage = %stage,
                path = %path.display(),
                trees = model.forest().n_trees(),
                task = %model.task(),
                "loaded stage model"
            );
            Ok(Box::new(model))
        };
        let adoption = load(Stage::Adoption)?;
        let automation = load(Stage::Automation)?;
        let displacement = load(Stage::Displacement)?;

        Self::from_parts(schema, adoption, automation, displacement)
    }

    /// Assemble a context from in-memory models, with the same validation
    /// as [`load`](Self::load).
    pub fn from_parts(
        schema: FeatureSchema,
        adoption: Box<dyn StageModel>,
        automation: Box<dyn StageModel>,
        displacement: Box<dyn StageModel>,
    ) -> Result<Self, ModelLoadError> {
        let context = Self {
            schema,
            models: [adoption, automation, displacement],
        };
        context.validate_wiring()?;
        tracing::debug!(columns = context.schema.len(), "model context ready");
        Ok(context)
    }

    #[inline]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[inline]
    pub fn model(&self, stage: Stage) -> &dyn StageModel {
        self.models[stage.index()].as_ref()
    }

    /// Class labels of the adoption model.
    pub fn adoption_labels(&self) -> &[String] {
        self.model(Stage::Adoption).task().labels()
    }

    /// Class labels of the displacement model.
    pub fn displacement_labels(&self) -> &[String] {
        self.model(Stage::Displacement).task().labels()
    }

    fn validate_wiring(&self) -> Result<(), ModelLoadError> {
        for stage in Stage::ORDER {
            let model = self.model(stage);

            if model.stage() != stage {
                return Err(ModelLoadError::wiring(
                    stage,
                    format!("artifact was trained for the {} stage", model.stage()),
                ));
            }

            let expected = self.schema.stage_columns(stage);
            if model.input_columns() != expected.as_slice() {
                return Err(ModelLoadError::wiring(
                    stage,
                    format!(
                        "model expects columns [{}], pipeline provides [{}]",
                        model.input_columns().join(", "),
                        expected.join(", ")
                    ),
                ));
            }

            let task = model.task();
            if task.is_classification() != stage.is_classifier() {
                let wanted = if stage.is_classifier() { "a classifier" } else { "a regressor" };
                return Err(ModelLoadError::wiring(stage, format!("expected {wanted}, got {task}")));
            }
            if stage.is_classifier() && task.labels().len() < 2 {
                return Err(ModelLoadError::wiring(stage, "classifier has fewer than 2 labels"));
            }
        }

        let adoption_labels = self.adoption_labels();
        for stage in [Stage::Automation, Stage::Displacement] {
            let layout = self.model(stage).input_layout();
            match layout.column(ADOPTION_STAGE_COLUMN).map(|c| &c.encoding) {
                Some(FeatureEncoding::Categorical(vocab)) => {
                    if let Some(missing) = adoption_labels.iter().find(|l| !vocab.contains(l)) {
                        return Err(ModelLoadError::wiring(
                            stage,
                            format!("`{ADOPTION_STAGE_COLUMN}` does not know adoption class `{missing}`"),
                        ));
                    }
                }
                _ => {
                    return Err(ModelLoadError::wiring(
                        stage,
                        format!("`{ADOPTION_STAGE_COLUMN}` must be a categorical input"),
                    ))
                }
            }
        }

        let layout = self.model(Stage::Displacement).input_layout();
        if !matches!(
            layout.column(AUTOMATION_RISK_COLUMN).map(|c| &c.encoding),
            Some(FeatureEncoding::Numeric)
        ) {
            return Err(ModelLoadError::wiring(
                Stage::Displacement,
                format!("`{AUTOMATION_RISK_COLUMN}` must be a numeric input"),
            ));
        }

        Ok(())
    }
}

fn locate(artifact: &str, candidates: Vec<PathBuf>) -> Result<PathBuf, ModelLoadError> {
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => Ok(path.clone()),
        None => {
            tracing::error!(artifact, "artifact not found");
            Err(ModelLoadError::NotFound {
                artifact: artifact.to_string(),
                searched: candidates,
            })
        }
    }
}
