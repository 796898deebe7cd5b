//! Stage models.
//!
//! A [`StageModel`] is an opaque trained predictor over named feature rows.
//! Classifiers and regressors share the same capability so the orchestrator
//! can drive all three stages the same way; the difference lives in
//! [`PredictionValue`].

mod forest;
mod meta;
pub mod transform;

use std::fmt;

pub use forest::{ForestStageModel, InvalidModelError};
pub use meta::TaskKind;
pub use transform::OutputTransform;

use crate::encoding::InputLayout;
use crate::error::StageError;
use crate::row::{FeatureRow, FeatureValue};
use crate::schema::Stage;

/// One prediction of a stage model.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionValue {
    /// Predicted class and its probability.
    Class { label: String, probability: f64 },
    /// Regression output.
    Score(f64),
}

impl PredictionValue {
    #[inline]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            PredictionValue::Class { label, .. } => Some(label),
            PredictionValue::Score(_) => None,
        }
    }

    #[inline]
    pub fn as_score(&self) -> Option<f64> {
        match self {
            PredictionValue::Score(v) => Some(*v),
            PredictionValue::Class { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PredictionValue::Class { .. } => "class label",
            PredictionValue::Score(_) => "score",
        }
    }

    /// Representation used when the value is appended to a row.
    pub fn to_feature(&self) -> FeatureValue {
        match self {
            PredictionValue::Class { label, .. } => FeatureValue::Categorical(label.clone()),
            PredictionValue::Score(v) => FeatureValue::Numeric(*v),
        }
    }
}

/// A trained predictor for one stage.
///
/// Implementations are immutable after construction and must be safe to
/// share across threads.
pub trait StageModel: Send + Sync + fmt::Debug {
    /// Stage this model was trained for.
    fn stage(&self) -> Stage;

    fn name(&self) -> &str {
        self.stage().name()
    }

    fn task(&self) -> &TaskKind;

    fn input_layout(&self) -> &InputLayout;

    /// Columns the model was trained on, in training order.
    fn input_columns(&self) -> &[String] {
        self.input_layout().names()
    }

    /// Predict one value per row. Pure function of the rows and the model.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<PredictionValue>, StageError>;
}

impl<M: StageModel + ?Sized> StageModel for Box<M> {
    fn stage(&self) -> Stage {
        (**self).stage()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn task(&self) -> &TaskKind {
        (**self).task()
    }

    fn input_layout(&self) -> &InputLayout {
        (**self).input_layout()
    }

    fn input_columns(&self) -> &[String] {
        (**self).input_columns()
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<PredictionValue>, StageError> {
        (**self).predict(rows)
    }
}
