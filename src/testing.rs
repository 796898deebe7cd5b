//! Deterministic synthetic artifacts.
//!
//! Small hand-built forests over the job-posting schema. They are not
//! trained on anything; the splits encode a few plausible rules so that
//! tests, benchmarks and the `demo-models` command can run the full
//! pipeline without the training toolchain.
//!
//! Rules, roughly:
//!
//! - adoption: Tech/Finance → Mature, Healthcare/Manufacturing/Energy →
//!   Growing, Education/Government/Retail → Emerging
//! - automation: base 0.3, higher for AI-intensive and analyst roles, low
//!   salaries and Mature industries; can exceed 1.0
//! - displacement: follows the raw automation score, softened for senior
//!   roles and Emerging industries

use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::encoding::{InputColumn, InputLayout};
use crate::error::ModelLoadError;
use crate::model::{ForestStageModel, InvalidModelError, OutputTransform, StageModel, TaskKind};
use crate::persist::{self, Format, WriteError};
use crate::pipeline::ModelContext;
use crate::repr::{Forest, Tree, TreeBuilder};
use crate::request::{JobPosting, CITIES, COMPANY_SIZES, INDUSTRIES, JOB_TITLES, SENIORITY_LEVELS};
use crate::row::RawParams;
use crate::schema::{FeatureSchema, Stage, ADOPTION_STAGE_COLUMN, AUTOMATION_RISK_COLUMN};

pub const ADOPTION_LABELS: [&str; 3] = ["Emerging", "Growing", "Mature"];
pub const DISPLACEMENT_LABELS: [&str; 3] = ["Low", "Medium", "High"];

// slot indices in the row each model sees
const POSTING_YEAR: u32 = 0;
const INDUSTRY: u32 = 3;
const JOB_TITLE: u32 = 4;
const SENIORITY: u32 = 5;
const AI_INTENSITY: u32 = 6;
const SALARY: u32 = 7;
const ADOPTION: u32 = 8;
const AUTOMATION: u32 = 9;

/// The eight base columns, in training order.
pub fn demo_schema() -> FeatureSchema {
    // a fixed list of distinct, non-reserved names
    match FeatureSchema::new(base_column_names()) {
        Ok(schema) => schema,
        Err(err) => unreachable!("demo schema is valid: {err}"),
    }
}

fn base_column_names() -> [&'static str; 8] {
    [
        "posting_year",
        "city",
        "company_size",
        "industry",
        "job_title",
        "seniority_level",
        "ai_intensity_score",
        "salary_usd",
    ]
}

fn base_columns() -> Result<Vec<InputColumn>, InvalidModelError> {
    Ok(vec![
        InputColumn::numeric("posting_year"),
        InputColumn::categorical("city", CITIES.iter().copied())?,
        InputColumn::categorical("company_size", COMPANY_SIZES.iter().copied())?,
        InputColumn::categorical("industry", INDUSTRIES.iter().copied())?,
        InputColumn::categorical("job_title", JOB_TITLES.iter().copied())?,
        InputColumn::categorical("seniority_level", SENIORITY_LEVELS.iter().copied())?,
        InputColumn::numeric("ai_intensity_score"),
        InputColumn::numeric("salary_usd"),
    ])
}

/// Category ids of `labels` within `options`.
fn ids(options: &[&str], labels: &[&str]) -> Vec<u32> {
    options
        .iter()
        .enumerate()
        .filter(|(_, o)| labels.contains(o))
        .map(|(i, _)| i as u32)
        .collect()
}

/// `left` unless the category is in `right_set`; missing goes left.
fn category_stump(feature: u32, right_set: &[u32], left: f32, right: f32) -> Tree {
    TreeBuilder::new()
        .categorical(0, feature, right_set, true, 1, 2)
        .leaf(1, left)
        .leaf(2, right)
        .build()
}

/// `left` when `value < threshold`, else `right`.
fn numeric_stump(feature: u32, threshold: f32, default_left: bool, left: f32, right: f32) -> Tree {
    TreeBuilder::new()
        .numeric(0, feature, threshold, default_left, 1, 2)
        .leaf(1, left)
        .leaf(2, right)
        .build()
}

pub fn adoption_model() -> Result<ForestStageModel, InvalidModelError> {
    let mut forest = Forest::new(3);
    // Emerging
    forest.push_tree(
        category_stump(INDUSTRY, &ids(INDUSTRIES, &["Education", "Government", "Retail"]), -0.5, 1.5),
        0,
    );
    // Growing
    forest.push_tree(
        category_stump(INDUSTRY, &ids(INDUSTRIES, &["Healthcare", "Manufacturing", "Energy"]), 0.0, 1.5),
        1,
    );
    forest.push_tree(numeric_stump(POSTING_YEAR, 2020.0, true, 0.5, 0.0), 1);
    // Mature
    forest.push_tree(category_stump(INDUSTRY, &ids(INDUSTRIES, &["Tech", "Finance"]), -0.5, 1.5), 2);
    forest.push_tree(numeric_stump(AI_INTENSITY, 0.3, false, -0.5, 0.3), 2);

    ForestStageModel::new(
        Stage::Adoption,
        forest,
        InputLayout::new(base_columns()?)?,
        TaskKind::classification(ADOPTION_LABELS),
        OutputTransform::Softmax,
    )
}

pub fn automation_model() -> Result<ForestStageModel, InvalidModelError> {
    let mut forest = Forest::for_regression().with_base_score(vec![0.3]);
    forest.push_tree(numeric_stump(AI_INTENSITY, 0.5, true, -0.1, 0.2), 0);
    forest.push_tree(numeric_stump(AI_INTENSITY, 0.9, true, 0.0, 0.25), 0);
    forest.push_tree(
        category_stump(
            JOB_TITLE,
            &ids(JOB_TITLES, &["Software Engineer", "Policy Analyst", "Business Analyst"]),
            0.0,
            0.35,
        ),
        0,
    );
    forest.push_tree(numeric_stump(SALARY, 60_000.0, false, 0.1, -0.05), 0);
    forest.push_tree(category_stump(ADOPTION, &ids(&ADOPTION_LABELS, &["Mature"]), 0.0, 0.1), 0);

    let mut columns = base_columns()?;
    columns.push(InputColumn::categorical(ADOPTION_STAGE_COLUMN, ADOPTION_LABELS)?);

    ForestStageModel::new(
        Stage::Automation,
        forest,
        InputLayout::new(columns)?,
        TaskKind::Regression,
        OutputTransform::Identity,
    )
}

pub fn displacement_model() -> Result<ForestStageModel, InvalidModelError> {
    let mut forest = Forest::new(3);
    // Low
    forest.push_tree(numeric_stump(AUTOMATION, 0.4, false, 1.0, -0.5), 0);
    forest.push_tree(
        category_stump(SENIORITY, &ids(SENIORITY_LEVELS, &["Senior", "Lead", "Executive"]), 0.0, 0.5),
        0,
    );
    // Medium: peaks between 0.4 and 0.7
    forest.push_tree(
        TreeBuilder::new()
            .numeric(0, AUTOMATION, 0.4, false, 1, 2)
            .leaf(1, 0.2)
            .numeric(2, AUTOMATION, 0.7, false, 3, 4)
            .leaf(3, 0.8)
            .leaf(4, 0.0)
            .build(),
        1,
    );
    // High
    forest.push_tree(numeric_stump(AUTOMATION, 0.7, false, -0.5, 1.2), 2);
    forest.push_tree(category_stump(ADOPTION, &ids(&ADOPTION_LABELS, &["Emerging"]), 0.0, 0.2), 2);

    let mut columns = base_columns()?;
    columns.push(InputColumn::categorical(ADOPTION_STAGE_COLUMN, ADOPTION_LABELS)?);
    columns.push(InputColumn::numeric(AUTOMATION_RISK_COLUMN));

    ForestStageModel::new(
        Stage::Displacement,
        forest,
        InputLayout::new(columns)?,
        TaskKind::classification(DISPLACEMENT_LABELS),
        OutputTransform::Softmax,
    )
}

/// Schema and the three synthetic stage models.
#[derive(Debug, Clone)]
pub struct DemoModels {
    pub schema: FeatureSchema,
    pub adoption: ForestStageModel,
    pub automation: ForestStageModel,
    pub displacement: ForestStageModel,
}

pub fn demo_models() -> Result<DemoModels, InvalidModelError> {
    Ok(DemoModels {
        schema: demo_schema(),
        adoption: adoption_model()?,
        automation: automation_model()?,
        displacement: displacement_model()?,
    })
}

impl DemoModels {
    pub fn into_context(self) -> Result<ModelContext, ModelLoadError> {
        ModelContext::from_parts(
            self.schema,
            Box::new(self.adoption),
            Box::new(self.automation),
            Box::new(self.displacement),
        )
    }

    /// Write the four artifacts into `dir` with the default file names.
    ///
    /// Returns the written paths.
    pub fn write(&self, dir: &Path, format: Format) -> Result<Vec<PathBuf>, WriteError> {
        std::fs::create_dir_all(dir)?;
        let config = PipelineConfig {
            model_dir: dir.to_path_buf(),
            ..PipelineConfig::default()
        };

        let schema_path = config.artifact_path(&config.feature_columns, format);
        persist::save_feature_schema(&self.schema, &schema_path, format)?;
        let mut written = vec![schema_path];

        for model in [&self.adoption, &self.automation, &self.displacement] {
            let stem = format!("{}{}", config.model_prefix, model.name());
            let path = config.artifact_path(&stem, format);
            persist::save_stage_model(model, &path, format)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Context over the synthetic models.
pub fn demo_context() -> Result<ModelContext, ModelLoadError> {
    demo_models()?.into_context()
}

/// The input form defaults: 2025, Bangalore, Large, Tech, ML Engineer, Mid.
pub fn example_params() -> RawParams {
    JobPosting::default().to_params()
}
