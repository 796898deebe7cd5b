//! Feature values and immutable feature rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::FeatureSchema;

/// Raw request parameters keyed by feature name.
///
/// A `BTreeMap` keeps iteration (and therefore logging) order stable.
pub type RawParams = std::collections::BTreeMap<String, FeatureValue>;

// =============================================================================
// FeatureValue
// =============================================================================

/// A single scalar feature value.
///
/// JSON form is untagged: numbers map to [`Numeric`](Self::Numeric), strings to
/// [`Categorical`](Self::Categorical) and `null` to [`Absent`](Self::Absent).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Continuous or integer feature.
    Numeric(f64),
    /// Categorical label.
    Categorical(String),
    /// Missing value sentinel. Encoded as NaN for the trees.
    #[default]
    Absent,
}

static ABSENT: FeatureValue = FeatureValue::Absent;

impl FeatureValue {
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, FeatureValue::Absent)
    }

    #[inline]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Numeric(_) => "numeric",
            FeatureValue::Categorical(_) => "categorical",
            FeatureValue::Absent => "absent",
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Numeric(v) => write!(f, "{v}"),
            FeatureValue::Categorical(s) => f.write_str(s),
            FeatureValue::Absent => f.write_str("<absent>"),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Numeric(v)
    }
}

impl From<f32> for FeatureValue {
    fn from(v: f32) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<u32> for FeatureValue {
    fn from(v: u32) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Categorical(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Categorical(v)
    }
}

impl<T: Into<FeatureValue>> From<Option<T>> for FeatureValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FeatureValue::Absent, Into::into)
    }
}

// =============================================================================
// FeatureRow
// =============================================================================

/// Ordered name → value row passed to a stage model.
///
/// Rows are values: [`with_column`](Self::with_column) returns a new row and
/// leaves `self` untouched, so every intermediate row of the pipeline stays
/// available for inspection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    names: Vec<String>,
    values: Vec<FeatureValue>,
}

impl FeatureRow {
    /// Project raw parameters onto the schema order.
    ///
    /// Every schema column is present in the result; columns missing from
    /// `params` become [`FeatureValue::Absent`]. Keys outside the schema are
    /// not copied.
    pub fn project(schema: &FeatureSchema, params: &RawParams) -> Self {
        let names = schema.columns().to_vec();
        let values = names
            .iter()
            .map(|name| params.get(name).cloned().unwrap_or_default())
            .collect();
        Self { names, values }
    }

    /// Build a row from `(name, value)` pairs in order.
    ///
    /// A repeated name overwrites the earlier value in place.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FeatureValue>,
    {
        pairs
            .into_iter()
            .fold(Self::default(), |row, (k, v)| row.with_column(k, v.into()))
    }

    /// Return a copy of this row with `name` set to `value`.
    ///
    /// New names are appended at the end; an existing name keeps its position.
    #[must_use]
    pub fn with_column(&self, name: impl Into<String>, value: FeatureValue) -> Self {
        let name = name.into();
        let mut next = self.clone();
        match next.names.iter().position(|n| *n == name) {
            Some(i) => next.values[i] = value,
            None => {
                next.names.push(name);
                next.values.push(value);
            }
        }
        next
    }

    /// Value for `name`; unknown names resolve to [`FeatureValue::Absent`].
    pub fn get(&self, name: &str) -> &FeatureValue {
        self.names
            .iter()
            .position(|n| n == name)
            .map_or(&ABSENT, |i| &self.values[i])
    }

    /// Whether `name` is a column of this row (absent or not).
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Names of columns holding the absent sentinel.
    pub fn absent_columns(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, v)| v.is_absent()).map(|(n, _)| n)
    }
}
