//! Pipeline configuration.
//!
//! [`PipelineConfig`] uses `bon` for the builder; `build()` validates.
//!
//! ```
//! use jobimpact::{AbsentPolicy, PipelineConfig, RiskClamp};
//!
//! // All defaults: ./models, clamped risk score, absent values allowed
//! let config = PipelineConfig::builder().build().unwrap();
//! assert_eq!(config.risk_clamp, RiskClamp::Clamp);
//!
//! let config = PipelineConfig::builder()
//!     .model_dir("/srv/jobimpact/models")
//!     .absent_policy(AbsentPolicy::Reject)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bon::Builder;
use thiserror::Error;

use crate::persist::Format;
use crate::schema::Stage;

/// Environment variable holding the model directory.
pub const ENV_MODEL_DIR: &str = "JOBIMPACT_MODEL_DIR";
/// Environment variable holding the [`RiskClamp`] mode.
pub const ENV_RISK_CLAMP: &str = "JOBIMPACT_RISK_CLAMP";
/// Environment variable holding the [`AbsentPolicy`].
pub const ENV_ABSENT_POLICY: &str = "JOBIMPACT_ABSENT_POLICY";

// =============================================================================
// ConfigError
// =============================================================================

/// Errors raised while building a [`PipelineConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("model_dir must not be empty")]
    EmptyModelDir,

    #[error("{field} must be a plain file name, got `{value}`")]
    InvalidFileName { field: &'static str, value: String },

    #[error("{key}: `{value}` is not one of {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

// =============================================================================
// RiskClamp / AbsentPolicy
// =============================================================================

/// How the reported automation risk score is bounded.
///
/// The displacement stage always receives the raw regressor output; this
/// only affects the value handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskClamp {
    /// Clamp to `[0, 1]`.
    #[default]
    Clamp,
    /// Report the raw regressor output.
    PassThrough,
}

impl RiskClamp {
    #[inline]
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            RiskClamp::Clamp => raw.clamp(0.0, 1.0),
            RiskClamp::PassThrough => raw,
        }
    }
}

impl FromStr for RiskClamp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(RiskClamp::Clamp),
            "pass_through" | "passthrough" | "pass-through" | "raw" => Ok(RiskClamp::PassThrough),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_RISK_CLAMP.to_string(),
                value: s.to_string(),
                expected: "clamp, pass_through",
            }),
        }
    }
}

impl fmt::Display for RiskClamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskClamp::Clamp => "clamp",
            RiskClamp::PassThrough => "pass_through",
        })
    }
}

/// What to do with a schema column the request did not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbsentPolicy {
    /// Feed it as a missing value; trees route it by default direction.
    #[default]
    Missing,
    /// Fail the request with a `ModelInputError`.
    Reject,
}

impl FromStr for AbsentPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "missing" | "nan" => Ok(AbsentPolicy::Missing),
            "reject" => Ok(AbsentPolicy::Reject),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_ABSENT_POLICY.to_string(),
                value: s.to_string(),
                expected: "missing, reject",
            }),
        }
    }
}

impl fmt::Display for AbsentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbsentPolicy::Missing => "missing",
            AbsentPolicy::Reject => "reject",
        })
    }
}

// =============================================================================
// PipelineConfig
// =============================================================================

/// Where the artifacts live and how requests are treated.
///
/// Artifacts are looked up as `<model_dir>/<feature_columns>.{jim,json}` and
/// `<model_dir>/<model_prefix><stage>.{jim,json}`; the binary file wins when
/// both exist.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct PipelineConfig {
    /// Directory holding the four artifacts. Default: `models`.
    #[builder(into, default = PathBuf::from("models"))]
    pub model_dir: PathBuf,

    /// File stem of the feature schema. Default: `feature_columns`.
    #[builder(into, default = String::from("feature_columns"))]
    pub feature_columns: String,

    /// File stem prefix of the stage models. Default: `model_`.
    #[builder(into, default = String::from("model_"))]
    pub model_prefix: String,

    #[builder(default)]
    pub risk_clamp: RiskClamp,

    #[builder(default)]
    pub absent_policy: AbsentPolicy,
}

impl<S: pipeline_config_builder::IsComplete> PipelineConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if `model_dir` is empty or a file stem contains a
    /// path separator.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyModelDir);
        }
        for (field, value) in [
            ("feature_columns", &self.feature_columns),
            ("model_prefix", &self.model_prefix),
        ] {
            if value.is_empty() || value.contains(['/', '\\']) {
                return Err(ConfigError::InvalidFileName {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Read the configuration from `JOBIMPACT_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let risk_clamp = lookup(ENV_RISK_CLAMP)
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();
        let absent_policy = lookup(ENV_ABSENT_POLICY)
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        match lookup(ENV_MODEL_DIR) {
            Some(dir) => Self::builder()
                .model_dir(dir)
                .risk_clamp(risk_clamp)
                .absent_policy(absent_policy)
                .build(),
            None => Self::builder()
                .risk_clamp(risk_clamp)
                .absent_policy(absent_policy)
                .build(),
        }
    }

    /// Candidate paths for the feature schema, in lookup order.
    pub fn feature_columns_paths(&self) -> Vec<PathBuf> {
        self.candidates(&self.feature_columns)
    }

    /// Candidate paths for the model of `stage`, in lookup order.
    pub fn stage_model_paths(&self, stage: Stage) -> Vec<PathBuf> {
        self.candidates(&format!("{}{}", self.model_prefix, stage.name()))
    }

    /// Path an artifact with `stem` is written to in `format`.
    pub fn artifact_path(&self, stem: &str, format: Format) -> PathBuf {
        self.model_dir.join(format!("{stem}.{}", format.extension()))
    }

    fn candidates(&self, stem: &str) -> Vec<PathBuf> {
        [Format::Binary, Format::Json]
            .into_iter()
            .map(|format| self.artifact_path(stem, format))
            .collect()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            feature_columns: String::from("feature_columns"),
            model_prefix: String::from("model_"),
            risk_clamp: RiskClamp::default(),
            absent_policy: AbsentPolicy::default(),
        }
    }
}
