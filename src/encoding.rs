//! Feature encoding: named rows → dense `f32` matrices.
//!
//! Every stage model carries an [`InputLayout`] frozen at training time. The
//! layout lists the input columns in slot order and, for categorical columns,
//! the vocabulary that maps a label to the integer category id used by the
//! tree splits.
//!
//! [`FeatureValue::Absent`] encodes as `NaN` and is routed by each split's
//! default direction.

use std::collections::HashMap;

use ndarray::Array2;
use thiserror::Error;

use crate::error::ModelInputError;
use crate::row::{FeatureRow, FeatureValue};

/// Errors raised while building a layout or vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("input layout has no columns")]
    EmptyLayout,

    #[error("input column `{0}` appears more than once")]
    DuplicateColumn(String),

    #[error("vocabulary of `{column}` is empty")]
    EmptyVocabulary { column: String },

    #[error("vocabulary of `{column}` repeats label `{label}`")]
    DuplicateLabel { column: String, label: String },
}

// =============================================================================
// CategoryVocabulary
// =============================================================================

/// Ordered category labels; a label's id is its position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryVocabulary {
    labels: Vec<String>,
    ids: HashMap<String, u32>,
}

impl CategoryVocabulary {
    /// Build a vocabulary. Labels must be unique.
    ///
    /// Returns the first repeated label on failure.
    pub fn new<I, S>(labels: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let mut ids = HashMap::with_capacity(labels.len());
        for (id, label) in labels.iter().enumerate() {
            if ids.insert(label.clone(), id as u32).is_some() {
                return Err(label.clone());
            }
        }
        Ok(Self { labels, ids })
    }

    #[inline]
    pub fn id(&self, label: &str) -> Option<u32> {
        self.ids.get(label).copied()
    }

    #[inline]
    pub fn label(&self, id: u32) -> Option<&str> {
        self.labels.get(id as usize).map(String::as_str)
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn contains(&self, label: &str) -> bool {
        self.ids.contains_key(label)
    }
}

// =============================================================================
// InputColumn / InputLayout
// =============================================================================

/// How one input slot is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureEncoding {
    Numeric,
    Categorical(CategoryVocabulary),
}

impl FeatureEncoding {
    /// Kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureEncoding::Numeric => "numeric",
            FeatureEncoding::Categorical(_) => "categorical",
        }
    }
}

/// A named input slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputColumn {
    pub name: String,
    pub encoding: FeatureEncoding,
}

impl InputColumn {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding: FeatureEncoding::Numeric,
        }
    }

    /// Categorical column with `labels` as its vocabulary, in id order.
    pub fn categorical<I, S>(name: impl Into<String>, labels: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let vocab = CategoryVocabulary::new(labels).map_err(|label| EncodingError::DuplicateLabel {
            column: name.clone(),
            label,
        })?;
        if vocab.is_empty() {
            return Err(EncodingError::EmptyVocabulary { column: name });
        }
        Ok(Self {
            name,
            encoding: FeatureEncoding::Categorical(vocab),
        })
    }

    /// Vocabulary of a categorical column.
    pub fn vocabulary(&self) -> Option<&CategoryVocabulary> {
        match &self.encoding {
            FeatureEncoding::Categorical(vocab) => Some(vocab),
            FeatureEncoding::Numeric => None,
        }
    }
}

/// Ordered input slots of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayout {
    columns: Vec<InputColumn>,
    names: Vec<String>,
}

impl InputLayout {
    pub fn new(columns: Vec<InputColumn>) -> Result<Self, EncodingError> {
        if columns.is_empty() {
            return Err(EncodingError::EmptyLayout);
        }
        let mut names: Vec<String> = Vec::with_capacity(columns.len());
        for column in &columns {
            if names.contains(&column.name) {
                return Err(EncodingError::DuplicateColumn(column.name.clone()));
            }
            if let FeatureEncoding::Categorical(vocab) = &column.encoding {
                if vocab.is_empty() {
                    return Err(EncodingError::EmptyVocabulary {
                        column: column.name.clone(),
                    });
                }
            }
            names.push(column.name.clone());
        }
        Ok(Self { columns, names })
    }

    #[inline]
    pub fn columns(&self) -> &[InputColumn] {
        &self.columns
    }

    /// Column names in slot order.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&InputColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Encode `rows` into a `[n_rows, n_features]` matrix.
    ///
    /// Values are looked up by name, so the row's own column order does not
    /// matter here; order is checked by the orchestrator.
    pub fn encode(&self, rows: &[FeatureRow]) -> Result<Array2<f32>, ModelInputError> {
        if rows.is_empty() {
            return Err(ModelInputError::EmptyBatch);
        }

        let mut out = Array2::<f32>::from_elem((rows.len(), self.columns.len()), f32::NAN);
        for (row_idx, row) in rows.iter().enumerate() {
            for (slot, column) in self.columns.iter().enumerate() {
                if !row.contains(&column.name) {
                    return Err(ModelInputError::MissingColumn {
                        row: row_idx,
                        column: column.name.clone(),
                    });
                }
                out[[row_idx, slot]] = encode_value(row_idx, column, row.get(&column.name))?;
            }
        }
        Ok(out)
    }
}

fn encode_value(row: usize, column: &InputColumn, value: &FeatureValue) -> Result<f32, ModelInputError> {
    match (&column.encoding, value) {
        (_, FeatureValue::Absent) => Ok(f32::NAN),
        (FeatureEncoding::Numeric, FeatureValue::Numeric(v)) => {
            if !v.is_finite() {
                return Err(ModelInputError::NonFinite {
                    row,
                    column: column.name.clone(),
                    value: *v,
                });
            }
            Ok(*v as f32)
        }
        (FeatureEncoding::Categorical(vocab), FeatureValue::Categorical(label)) => vocab
            .id(label)
            .map(|id| id as f32)
            .ok_or_else(|| ModelInputError::UnknownCategory {
                row,
                column: column.name.clone(),
                value: label.clone(),
            }),
        (encoding, value) => Err(ModelInputError::TypeMismatch {
            row,
            column: column.name.clone(),
            expected: encoding.kind(),
            found: value.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> InputLayout {
        InputLayout::new(vec![
            InputColumn::numeric("salary_usd"),
            InputColumn::categorical("city", ["London", "Tokyo"]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn encodes_by_name() {
        // row order differs from slot order
        let row = FeatureRow::from_pairs([
            ("city", FeatureValue::from("Tokyo")),
            ("salary_usd", FeatureValue::from(50_000.0)),
        ]);
        let m = layout().encode(&[row]).unwrap();
        assert_eq!(m.dim(), (1, 2));
        assert_eq!(m[[0, 0]], 50_000.0);
        assert_eq!(m[[0, 1]], 1.0);
    }

    #[test]
    fn absent_is_nan() {
        let row = FeatureRow::from_pairs([
            ("salary_usd", FeatureValue::Absent),
            ("city", FeatureValue::from("London")),
        ]);
        let m = layout().encode(&[row]).unwrap();
        assert!(m[[0, 0]].is_nan());
        assert_eq!(m[[0, 1]], 0.0);
    }

    #[test]
    fn rejects_bad_values() {
        let layout = layout();

        let unknown = FeatureRow::from_pairs([
            ("salary_usd", FeatureValue::from(1.0)),
            ("city", FeatureValue::from("Paris")),
        ]);
        assert_eq!(
            layout.encode(&[unknown]),
            Err(ModelInputError::UnknownCategory {
                row: 0,
                column: "city".into(),
                value: "Paris".into(),
            })
        );

        let mismatch = FeatureRow::from_pairs([
            ("salary_usd", FeatureValue::from("high")),
            ("city", FeatureValue::from("London")),
        ]);
        assert!(matches!(
            layout.encode(&[mismatch]),
            Err(ModelInputError::TypeMismatch { expected: "numeric", found: "categorical", .. })
        ));

        let missing = FeatureRow::from_pairs([("salary_usd", 1.0)]);
        assert!(matches!(
            layout.encode(&[missing]),
            Err(ModelInputError::MissingColumn { .. })
        ));

        let infinite = FeatureRow::from_pairs([
            ("salary_usd", FeatureValue::from(f64::INFINITY)),
            ("city", FeatureValue::from("London")),
        ]);
        assert!(matches!(
            layout.encode(&[infinite]),
            Err(ModelInputError::NonFinite { .. })
        ));

        assert_eq!(layout.encode(&[]), Err(ModelInputError::EmptyBatch));
    }

    #[test]
    fn layout_validation() {
        assert_eq!(InputLayout::new(vec![]), Err(EncodingError::EmptyLayout));
        assert_eq!(
            InputLayout::new(vec![InputColumn::numeric("a"), InputColumn::numeric("a")]),
            Err(EncodingError::DuplicateColumn("a".into()))
        );
        assert!(matches!(
            InputColumn::categorical("c", ["x", "x"]),
            Err(EncodingError::DuplicateLabel { .. })
        ));
        assert!(matches!(
            InputColumn::categorical("c", Vec::<String>::new()),
            Err(EncodingError::EmptyVocabulary { .. })
        ));
    }

    #[test]
    fn vocabulary_lookup() {
        let vocab = CategoryVocabulary::new(["Emerging", "Growing", "Mature"]).unwrap();
        assert_eq!(vocab.id("Growing"), Some(1));
        assert_eq!(vocab.label(2), Some("Mature"));
        assert_eq!(vocab.label(3), None);
        assert!(!vocab.contains("Declining"));
    }
}
