//! Serialization schema for persisted artifacts.
//!
//! Schema types are separate from runtime types so the on-disk layout can
//! evolve independently and every load goes through validation. The same
//! types back both the JSON and the native binary format, so they avoid
//! serde features the binary encoding cannot express (untagged or
//! internally tagged enums, skipped fields).

use serde::{Deserialize, Serialize};

use crate::schema::Stage;

/// Current artifact format version.
pub const FORMAT_VERSION: u32 = 1;

/// Task of a stage model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSchema {
    Regression,
    Classification { labels: Vec<String> },
}

/// Output transform applied to forest margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTransformSchema {
    Identity,
    Sigmoid,
    Softmax,
}

/// Encoding of one input column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEncodingSchema {
    Numeric,
    /// Category id is the label's position in `categories`.
    Categorical { categories: Vec<String> },
}

/// One input column of a stage model, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputColumnSchema {
    pub name: String,
    pub encoding: InputEncodingSchema,
}

/// Categorical splits of one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesSchema {
    /// Nodes with a categorical split.
    pub node_indices: Vec<u32>,
    /// Right-going category ids, one set per entry of `node_indices`.
    pub category_sets: Vec<Vec<u32>>,
}

/// One tree in SoA layout.
///
/// A node is a leaf when both its children are 0 (the root can never be a
/// child). A node listed in `categories.node_indices` splits categorically;
/// all other internal nodes split on `value < threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSchema {
    pub num_nodes: u32,
    pub split_indices: Vec<u32>,
    pub thresholds: Vec<f64>,
    pub children_left: Vec<u32>,
    pub children_right: Vec<u32>,
    /// Direction of missing values (true = left).
    pub default_left: Vec<bool>,
    pub leaf_values: Vec<f64>,
    #[serde(default)]
    pub categories: CategoriesSchema,
}

/// Tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSchema {
    pub trees: Vec<TreeSchema>,
    /// Output group of each tree.
    pub tree_groups: Vec<u32>,
    pub n_groups: u32,
    pub base_score: Vec<f64>,
}

/// A complete persisted stage model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageModelSchema {
    pub format_version: u32,
    pub stage: Stage,
    pub task: TaskSchema,
    pub inputs: Vec<InputColumnSchema>,
    pub output_transform: OutputTransformSchema,
    pub forest: ForestSchema,
}

/// Persisted feature schema (`feature_columns.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumnsSchema {
    pub columns: Vec<String>,
}

/// JSON-only reader form: the document or a bare array of names.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum FeatureColumnsJson {
    Document(FeatureColumnsSchema),
    Bare(Vec<String>),
}

impl From<FeatureColumnsJson> for FeatureColumnsSchema {
    fn from(value: FeatureColumnsJson) -> Self {
        match value {
            FeatureColumnsJson::Document(doc) => doc,
            FeatureColumnsJson::Bare(columns) => FeatureColumnsSchema { columns },
        }
    }
}
