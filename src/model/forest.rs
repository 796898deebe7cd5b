//! Tree-ensemble stage model.

use thiserror::Error;

use super::{OutputTransform, PredictionValue, StageModel, TaskKind};
use crate::encoding::{EncodingError, FeatureEncoding, InputLayout};
use crate::error::{ModelInputError, StageError};
use crate::repr::{Forest, ForestValidationError, SplitType};
use crate::row::FeatureRow;
use crate::schema::Stage;

/// A forest, task and transform that do not fit together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidModelError {
    #[error("invalid forest: {0}")]
    Forest(#[from] ForestValidationError),

    #[error("invalid input layout: {0}")]
    Encoding(#[from] EncodingError),

    #[error("{0}")]
    Task(String),

    #[error("tree {tree_idx} node {node}: {reason}")]
    Split { tree_idx: usize, node: u32, reason: String },
}

/// [`StageModel`] backed by a gradient-boosted [`Forest`].
///
/// Rows are encoded through the model's [`InputLayout`], the forest produces
/// one margin per output group, and [`OutputTransform`] turns margins into a
/// score or class probabilities.
///
/// Supported shapes:
///
/// | task                      | groups     | transform  |
/// |---------------------------|------------|------------|
/// | regression                | 1          | identity   |
/// | classification, 2 labels  | 1          | sigmoid    |
/// | classification, k labels  | k          | softmax    |
#[derive(Debug, Clone)]
pub struct ForestStageModel {
    stage: Stage,
    forest: Forest,
    layout: InputLayout,
    task: TaskKind,
    transform: OutputTransform,
}

impl ForestStageModel {
    pub fn new(
        stage: Stage,
        forest: Forest,
        layout: InputLayout,
        task: TaskKind,
        transform: OutputTransform,
    ) -> Result<Self, InvalidModelError> {
        forest.validate(Some(layout.n_features()))?;
        check_categorical_splits(&forest, &layout)?;
        check_shape(&task, forest.n_groups() as usize, transform)?;
        Ok(Self {
            stage,
            forest,
            layout,
            task,
            transform,
        })
    }

    #[inline]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    #[inline]
    pub fn transform(&self) -> OutputTransform {
        self.transform
    }

    fn decode(&self, outputs: &[f32]) -> PredictionValue {
        match &self.task {
            TaskKind::Regression => PredictionValue::Score(outputs[0] as f64),
            TaskKind::Classification { labels } => {
                let (class, probability) = match self.transform {
                    OutputTransform::Sigmoid => {
                        let p = outputs[0];
                        if p >= 0.5 {
                            (1, p)
                        } else {
                            (0, 1.0 - p)
                        }
                    }
                    _ => argmax(outputs),
                };
                PredictionValue::Class {
                    label: labels[class].clone(),
                    probability: probability as f64,
                }
            }
        }
    }
}

/// Categorical splits must read a categorical slot and only name ids from
/// that slot's vocabulary.
fn check_categorical_splits(forest: &Forest, layout: &InputLayout) -> Result<(), InvalidModelError> {
    for (tree_idx, tree) in forest.trees().enumerate() {
        for node in 0..tree.n_nodes() as u32 {
            if tree.is_leaf(node) || tree.split_type(node) != SplitType::Categorical {
                continue;
            }
            let split_err = |reason: String| InvalidModelError::Split { tree_idx, node, reason };
            let column = &layout.columns()[tree.split_index(node) as usize];
            let FeatureEncoding::Categorical(vocab) = &column.encoding else {
                return Err(split_err(format!("categorical split on numeric column `{}`", column.name)));
            };
            let n_labels = vocab.labels().len() as u32;
            if let Some(id) = tree.categories().category_set(node).into_iter().find(|&id| id >= n_labels) {
                return Err(split_err(format!(
                    "category id {id} outside the {n_labels} labels of `{}`",
                    column.name
                )));
            }
        }
    }
    Ok(())
}

fn check_shape(task: &TaskKind, n_groups: usize, transform: OutputTransform) -> Result<(), InvalidModelError> {
    let invalid = |msg: String| -> Result<(), InvalidModelError> { Err(InvalidModelError::Task(msg)) };
    match (task, transform) {
        (TaskKind::Regression, OutputTransform::Identity) if n_groups == 1 => Ok(()),
        (TaskKind::Regression, OutputTransform::Identity) => {
            invalid(format!("regression needs 1 output group, forest has {n_groups}"))
        }
        (TaskKind::Regression, t) => invalid(format!("regression cannot use the {} transform", t.name())),
        (TaskKind::Classification { labels }, t) => {
            if labels.len() < 2 {
                return invalid(format!("classification needs at least 2 labels, got {}", labels.len()));
            }
            for (i, label) in labels.iter().enumerate() {
                if labels[..i].contains(label) {
                    return invalid(format!("class label `{label}` appears more than once"));
                }
            }
            match t {
                OutputTransform::Sigmoid if labels.len() == 2 && n_groups == 1 => Ok(()),
                OutputTransform::Sigmoid => invalid(format!(
                    "sigmoid needs 2 labels and 1 output group, got {} labels and {n_groups} groups",
                    labels.len()
                )),
                OutputTransform::Softmax if n_groups == labels.len() => Ok(()),
                OutputTransform::Softmax => invalid(format!(
                    "softmax needs one output group per label, got {} labels and {n_groups} groups",
                    labels.len()
                )),
                OutputTransform::Identity => {
                    invalid("classification needs a sigmoid or softmax transform".to_string())
                }
            }
        }
    }
}

/// Index and value of the largest output; ties go to the lowest index.
fn argmax(outputs: &[f32]) -> (usize, f32) {
    let mut best = 0;
    for (i, &p) in outputs.iter().enumerate().skip(1) {
        if p > outputs[best] {
            best = i;
        }
    }
    (best, outputs[best])
}

impl StageModel for ForestStageModel {
    fn stage(&self) -> Stage {
        self.stage
    }

    fn task(&self) -> &TaskKind {
        &self.task
    }

    fn input_layout(&self) -> &InputLayout {
        &self.layout
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<PredictionValue>, StageError> {
        if rows.is_empty() {
            return Err(ModelInputError::EmptyBatch.into());
        }

        let features = self.layout.encode(rows)?;
        let margins = self.forest.predict(features.view());

        let n_groups = self.forest.n_groups() as usize;
        let mut outputs: Vec<f32> = margins.iter().copied().collect();
        self.transform.transform_inplace(&mut outputs, n_groups);

        tracing::trace!(stage = %self.stage, rows = rows.len(), "forest stage predicted");
        Ok(outputs.chunks_exact(n_groups).map(|o| self.decode(o)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::InputColumn;
    use crate::repr::TreeBuilder;
    use crate::row::FeatureValue;
    use approx::assert_abs_diff_eq;

    fn layout() -> InputLayout {
        InputLayout::new(vec![
            InputColumn::numeric("x"),
            InputColumn::categorical("c", ["a", "b", "c"]).unwrap(),
        ])
        .unwrap()
    }

    fn row(x: impl Into<FeatureValue>, c: &str) -> FeatureRow {
        FeatureRow::from_pairs([("x", x.into()), ("c", FeatureValue::from(c))])
    }

    fn regressor() -> ForestStageModel {
        let mut forest = Forest::for_regression().with_base_score(vec![0.1]);
        forest.push_tree(
            TreeBuilder::new()
                .numeric(0, 0, 0.5, true, 1, 2)
                .leaf(1, 0.2)
                .leaf(2, 0.6)
                .build(),
            0,
        );
        ForestStageModel::new(Stage::Automation, forest, layout(), TaskKind::Regression, OutputTransform::Identity)
            .unwrap()
    }

    #[test]
    fn regression_scores() {
        let model = regressor();
        let out = model.predict(&[row(0.2, "a"), row(0.9, "a"), row(FeatureValue::Absent, "a")]).unwrap();
        assert_abs_diff_eq!(out[0].as_score().unwrap(), 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1].as_score().unwrap(), 0.7, epsilon = 1e-6);
        // absent follows default-left
        assert_abs_diff_eq!(out[2].as_score().unwrap(), 0.3, epsilon = 1e-6);
        assert_eq!(model.input_columns(), &["x", "c"]);
        assert_eq!(model.name(), "automation");
    }

    #[test]
    fn binary_classification_threshold() {
        let mut forest = Forest::new(1);
        // category `b` goes right to a positive margin
        forest.push_tree(
            TreeBuilder::new()
                .categorical(0, 1, &[1], true, 1, 2)
                .leaf(1, -2.0)
                .leaf(2, 2.0)
                .build(),
            0,
        );
        let model = ForestStageModel::new(
            Stage::Displacement,
            forest,
            layout(),
            TaskKind::classification(["No", "Yes"]),
            OutputTransform::Sigmoid,
        )
        .unwrap();

        let out = model.predict(&[row(0.0, "a"), row(0.0, "b")]).unwrap();
        assert_eq!(out[0].as_label(), Some("No"));
        assert_eq!(out[1].as_label(), Some("Yes"));
        match &out[0] {
            PredictionValue::Class { probability, .. } => assert!(*probability > 0.5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn multiclass_ties_pick_lowest_index() {
        // no trees: all margins equal, softmax is uniform
        let forest = Forest::new(3);
        let model = ForestStageModel::new(
            Stage::Adoption,
            forest,
            layout(),
            TaskKind::classification(["Emerging", "Growing", "Mature"]),
            OutputTransform::Softmax,
        )
        .unwrap();
        let out = model.predict(&[row(1.0, "c")]).unwrap();
        assert_eq!(out[0].as_label(), Some("Emerging"));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let err = ForestStageModel::new(
            Stage::Adoption,
            Forest::new(2),
            layout(),
            TaskKind::classification(["a", "b", "c"]),
            OutputTransform::Softmax,
        )
        .unwrap_err();
        assert!(err.to_string().contains("one output group per label"));

        assert!(ForestStageModel::new(
            Stage::Automation,
            Forest::for_regression(),
            layout(),
            TaskKind::Regression,
            OutputTransform::Sigmoid,
        )
        .is_err());

        assert!(ForestStageModel::new(
            Stage::Adoption,
            Forest::new(1),
            layout(),
            TaskKind::classification(["a", "a"]),
            OutputTransform::Sigmoid,
        )
        .is_err());

        // split reads past the layout width
        let mut forest = Forest::for_regression();
        forest.push_tree(TreeBuilder::new().numeric(0, 5, 0.0, true, 1, 2).leaf(1, 0.0).leaf(2, 1.0).build(), 0);
        assert!(matches!(
            ForestStageModel::new(Stage::Automation, forest, layout(), TaskKind::Regression, OutputTransform::Identity),
            Err(InvalidModelError::Forest(_))
        ));
    }

    #[test]
    fn categorical_splits_must_match_the_layout() {
        let model_with = |feature: u32, right_set: &[u32]| {
            let mut forest = Forest::for_regression();
            forest.push_tree(
                TreeBuilder::new()
                    .categorical(0, feature, right_set, true, 1, 2)
                    .leaf(1, 0.0)
                    .leaf(2, 1.0)
                    .build(),
                0,
            );
            ForestStageModel::new(Stage::Automation, forest, layout(), TaskKind::Regression, OutputTransform::Identity)
        };

        assert!(model_with(1, &[0, 2]).is_ok());

        // `x` is numeric
        match model_with(0, &[1]) {
            Err(InvalidModelError::Split { tree_idx: 0, node: 0, reason }) => assert!(reason.contains("`x`")),
            other => panic!("unexpected {other:?}"),
        }

        // `c` only has ids 0..3
        match model_with(1, &[1, 5]) {
            Err(InvalidModelError::Split { node: 0, reason, .. }) => assert!(reason.contains("category id 5")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn input_errors_surface_as_stage_errors() {
        let model = regressor();
        assert_eq!(model.predict(&[]), Err(StageError::Input(ModelInputError::EmptyBatch)));
        assert!(matches!(
            model.predict(&[row(0.1, "zzz")]),
            Err(StageError::Input(ModelInputError::UnknownCategory { .. }))
        ));
    }
}
