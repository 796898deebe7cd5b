//! Feature schema and stage wiring.
//!
//! [`FeatureSchema`] is the ordered list of base columns every stage consumes.
//! Each [`Stage`] sees the base columns followed by the derived columns of the
//! stages before it, so the schema also decides the column order of every
//! augmented row.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column appended after the adoption stage.
pub const ADOPTION_STAGE_COLUMN: &str = "industry_ai_adoption_stage";

/// Column appended after the automation stage.
pub const AUTOMATION_RISK_COLUMN: &str = "automation_risk_score";

/// Response field for the displacement stage (never fed back as a feature).
pub const DISPLACEMENT_RISK_COLUMN: &str = "ai_job_displacement_risk";

/// Derived columns in the order they are appended.
pub const DERIVED_COLUMNS: [&str; 2] = [ADOPTION_STAGE_COLUMN, AUTOMATION_RISK_COLUMN];

// =============================================================================
// Stage
// =============================================================================

/// One of the three chained predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Industry AI adoption stage (classifier).
    Adoption,
    /// Automation risk score (regressor).
    Automation,
    /// AI job displacement risk (classifier).
    Displacement,
}

impl Stage {
    /// Execution order. Each stage depends on all stages before it.
    pub const ORDER: [Stage; 3] = [Stage::Adoption, Stage::Automation, Stage::Displacement];

    /// Position in [`Stage::ORDER`].
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Stage::Adoption => 0,
            Stage::Automation => 1,
            Stage::Displacement => 2,
        }
    }

    /// Short name used in logs and artifact file names.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Adoption => "adoption",
            Stage::Automation => "automation",
            Stage::Displacement => "displacement",
        }
    }

    /// Derived columns this stage expects after the base columns.
    #[inline]
    pub fn derived_inputs(self) -> &'static [&'static str] {
        &DERIVED_COLUMNS[..self.index()]
    }

    /// Name of the value this stage produces.
    pub fn output_column(self) -> &'static str {
        match self {
            Stage::Adoption => ADOPTION_STAGE_COLUMN,
            Stage::Automation => AUTOMATION_RISK_COLUMN,
            Stage::Displacement => DISPLACEMENT_RISK_COLUMN,
        }
    }

    /// Whether the stage predicts a class label (otherwise a score).
    #[inline]
    pub fn is_classifier(self) -> bool {
        !matches!(self, Stage::Automation)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// SchemaError
// =============================================================================

/// Errors raised when building a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("feature schema has no columns")]
    Empty,

    #[error("column {position} has an empty name")]
    EmptyName { position: usize },

    #[error("column `{name}` appears more than once")]
    Duplicate { name: String },

    #[error("column `{name}` is produced by the pipeline and cannot be a base feature")]
    Reserved { name: String },
}

// =============================================================================
// FeatureSchema
// =============================================================================

/// Ordered base columns shared by all three stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from column names in order.
    pub fn new<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (position, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SchemaError::EmptyName { position });
            }
            if name == DISPLACEMENT_RISK_COLUMN || DERIVED_COLUMNS.contains(&name.as_str()) {
                return Err(SchemaError::Reserved { name: name.clone() });
            }
            if positions.insert(name.clone(), position).is_some() {
                return Err(SchemaError::Duplicate { name: name.clone() });
            }
        }

        Ok(Self { columns, positions })
    }

    /// Column names in order.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of base columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false for a constructed schema; kept for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether `name` is a base column.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Position of `name` in the schema.
    #[inline]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Iterate over column names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Full column sequence of the row fed to `stage`.
    pub fn stage_columns(&self, stage: Stage) -> Vec<String> {
        self.columns
            .iter()
            .cloned()
            .chain(stage.derived_inputs().iter().map(|c| (*c).to_string()))
            .collect()
    }
}
