//! Conversion between runtime types and schema types.
//!
//! Runtime → schema is infallible. Schema → runtime checks array lengths and
//! then runs the same validation as in-memory construction, so a loaded model
//! is always safe to predict with.

use super::error::ReadError;
use super::schema::{
    CategoriesSchema, FeatureColumnsSchema, ForestSchema, InputColumnSchema, InputEncodingSchema,
    OutputTransformSchema, StageModelSchema, TaskSchema, TreeSchema, FORMAT_VERSION,
};
use crate::encoding::{FeatureEncoding, InputColumn, InputLayout};
use crate::model::{ForestStageModel, OutputTransform, StageModel, TaskKind};
use crate::repr::{CategoriesStorage, Forest, SplitType, Tree};
use crate::schema::FeatureSchema;

/// Largest category id a stored split may name. Bitsets are sized by the
/// largest id, so this bounds the allocation for untrusted artifacts.
const MAX_CATEGORY_ID: u32 = u16::MAX as u32;

// ============================================================================
// Feature schema
// ============================================================================

impl From<&FeatureSchema> for FeatureColumnsSchema {
    fn from(schema: &FeatureSchema) -> Self {
        Self {
            columns: schema.columns().to_vec(),
        }
    }
}

impl TryFrom<FeatureColumnsSchema> for FeatureSchema {
    type Error = ReadError;

    fn try_from(value: FeatureColumnsSchema) -> Result<Self, Self::Error> {
        Ok(FeatureSchema::new(value.columns)?)
    }
}

// ============================================================================
// Small enums
// ============================================================================

impl From<OutputTransform> for OutputTransformSchema {
    fn from(t: OutputTransform) -> Self {
        match t {
            OutputTransform::Identity => Self::Identity,
            OutputTransform::Sigmoid => Self::Sigmoid,
            OutputTransform::Softmax => Self::Softmax,
        }
    }
}

impl From<OutputTransformSchema> for OutputTransform {
    fn from(t: OutputTransformSchema) -> Self {
        match t {
            OutputTransformSchema::Identity => Self::Identity,
            OutputTransformSchema::Sigmoid => Self::Sigmoid,
            OutputTransformSchema::Softmax => Self::Softmax,
        }
    }
}

impl From<&TaskKind> for TaskSchema {
    fn from(task: &TaskKind) -> Self {
        match task {
            TaskKind::Regression => Self::Regression,
            TaskKind::Classification { labels } => Self::Classification { labels: labels.clone() },
        }
    }
}

impl From<TaskSchema> for TaskKind {
    fn from(task: TaskSchema) -> Self {
        match task {
            TaskSchema::Regression => Self::Regression,
            TaskSchema::Classification { labels } => Self::Classification { labels },
        }
    }
}

// ============================================================================
// Input layout
// ============================================================================

fn layout_to_schema(layout: &InputLayout) -> Vec<InputColumnSchema> {
    layout
        .columns()
        .iter()
        .map(|c| InputColumnSchema {
            name: c.name.clone(),
            encoding: match &c.encoding {
                FeatureEncoding::Numeric => InputEncodingSchema::Numeric,
                FeatureEncoding::Categorical(vocab) => InputEncodingSchema::Categorical {
                    categories: vocab.labels().to_vec(),
                },
            },
        })
        .collect()
}

fn schema_to_layout(inputs: Vec<InputColumnSchema>) -> Result<InputLayout, ReadError> {
    let columns = inputs
        .into_iter()
        .map(|c| match c.encoding {
            InputEncodingSchema::Numeric => Ok(InputColumn::numeric(c.name)),
            InputEncodingSchema::Categorical { categories } => InputColumn::categorical(c.name, categories),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(InputLayout::new(columns)?)
}

// ============================================================================
// Trees and forests
// ============================================================================

impl From<&Tree> for TreeSchema {
    fn from(tree: &Tree) -> Self {
        let n = tree.n_nodes();
        let mut schema = TreeSchema {
            num_nodes: n as u32,
            split_indices: Vec::with_capacity(n),
            thresholds: Vec::with_capacity(n),
            children_left: Vec::with_capacity(n),
            children_right: Vec::with_capacity(n),
            default_left: Vec::with_capacity(n),
            leaf_values: Vec::with_capacity(n),
            categories: CategoriesSchema::default(),
        };

        for node in 0..n as u32 {
            let leaf = tree.is_leaf(node);
            schema.split_indices.push(if leaf { 0 } else { tree.split_index(node) });
            schema.thresholds.push(if leaf { 0.0 } else { tree.split_threshold(node) as f64 });
            schema.children_left.push(if leaf { 0 } else { tree.left_child(node) });
            schema.children_right.push(if leaf { 0 } else { tree.right_child(node) });
            schema.default_left.push(!leaf && tree.default_left(node));
            schema.leaf_values.push(if leaf { tree.leaf_value(node) as f64 } else { 0.0 });

            if !leaf && tree.split_type(node) == SplitType::Categorical {
                schema.categories.node_indices.push(node);
                schema.categories.category_sets.push(tree.categories().category_set(node));
            }
        }
        schema
    }
}

impl TryFrom<TreeSchema> for Tree {
    type Error = ReadError;

    fn try_from(t: TreeSchema) -> Result<Self, Self::Error> {
        let n = t.num_nodes as usize;
        let lens = [
            ("split_indices", t.split_indices.len()),
            ("thresholds", t.thresholds.len()),
            ("children_left", t.children_left.len()),
            ("children_right", t.children_right.len()),
            ("default_left", t.default_left.len()),
            ("leaf_values", t.leaf_values.len()),
        ];
        for (field, len) in lens {
            if len != n {
                return Err(ReadError::Corrupt(format!("tree has {n} nodes but {len} {field}")));
            }
        }

        let cats = &t.categories;
        if cats.node_indices.len() != cats.category_sets.len() {
            return Err(ReadError::Corrupt(format!(
                "{} categorical nodes but {} category sets",
                cats.node_indices.len(),
                cats.category_sets.len()
            )));
        }
        if let Some(&id) = cats.category_sets.iter().flatten().find(|&&id| id > MAX_CATEGORY_ID) {
            return Err(ReadError::Corrupt(format!(
                "category id {id} exceeds the limit of {MAX_CATEGORY_ID}"
            )));
        }
        let mut split_types = vec![SplitType::Numeric; n];
        for &node in &cats.node_indices {
            let slot = split_types
                .get_mut(node as usize)
                .ok_or_else(|| ReadError::Corrupt(format!("categorical node {node} out of range")))?;
            *slot = SplitType::Categorical;
        }

        let is_leaf: Vec<bool> = t
            .children_left
            .iter()
            .zip(&t.children_right)
            .map(|(&l, &r)| l == 0 && r == 0)
            .collect();

        let categories = CategoriesStorage::from_node_sets(
            n,
            cats.node_indices
                .iter()
                .copied()
                .zip(cats.category_sets.iter().map(Vec::as_slice)),
        );

        Ok(Tree::new(
            t.split_indices,
            t.thresholds.into_iter().map(|v| v as f32).collect(),
            t.children_left,
            t.children_right,
            t.default_left,
            is_leaf,
            t.leaf_values.into_iter().map(|v| v as f32).collect(),
            split_types,
            categories,
        ))
    }
}

impl From<&Forest> for ForestSchema {
    fn from(forest: &Forest) -> Self {
        Self {
            trees: forest.trees().map(TreeSchema::from).collect(),
            tree_groups: forest.tree_groups().to_vec(),
            n_groups: forest.n_groups(),
            base_score: forest.base_score().iter().map(|&v| v as f64).collect(),
        }
    }
}

impl TryFrom<ForestSchema> for Forest {
    type Error = ReadError;

    fn try_from(f: ForestSchema) -> Result<Self, Self::Error> {
        let trees = f
            .trees
            .into_iter()
            .map(Tree::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let base_score = f.base_score.into_iter().map(|v| v as f32).collect();
        // structural checks happen in ForestStageModel::new
        Ok(Forest::from_parts(trees, f.tree_groups, f.n_groups, base_score))
    }
}

// ============================================================================
// Stage model
// ============================================================================

impl From<&ForestStageModel> for StageModelSchema {
    fn from(model: &ForestStageModel) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            stage: model.stage(),
            task: model.task().into(),
            inputs: layout_to_schema(model.input_layout()),
            output_transform: model.transform().into(),
            forest: model.forest().into(),
        }
    }
}

impl TryFrom<StageModelSchema> for ForestStageModel {
    type Error = ReadError;

    fn try_from(s: StageModelSchema) -> Result<Self, Self::Error> {
        if s.format_version > FORMAT_VERSION {
            return Err(ReadError::UnsupportedVersion {
                found: s.format_version,
                supported: FORMAT_VERSION,
            });
        }
        let layout = schema_to_layout(s.inputs)?;
        let forest = Forest::try_from(s.forest)?;
        Ok(ForestStageModel::new(
            s.stage,
            forest,
            layout,
            s.task.into(),
            s.output_transform.into(),
        )?)
    }
}
