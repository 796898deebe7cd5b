//! Artifact persistence.
//!
//! Two formats share one schema ([`schema`]):
//!
//! - JSON (`*.json`): human-readable, produced by the training export.
//! - Native binary (`*.jim`): header + postcard payload with a CRC32 check.
//!
//! Readers sniff the magic bytes, so either format can be loaded from any
//! path. A `.jim` path must hold a native artifact.
//!
//! ```no_run
//! use jobimpact::persist::{self, Format};
//!
//! let model = persist::load_stage_model("models/model_adoption.json")?;
//! persist::save_stage_model(&model, "models/model_adoption.jim", Format::Binary)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod convert;
mod error;
pub mod native;
pub mod schema;

use std::path::Path;

pub use error::{ReadError, WriteError};
pub use native::ArtifactKind;

use crate::model::{ForestStageModel, StageModel};
use crate::schema::FeatureSchema;
use schema::{FeatureColumnsJson, FeatureColumnsSchema, StageModelSchema};

/// On-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Binary,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Binary => "jim",
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Format::Json),
            "jim" => Some(Format::Binary),
            _ => None,
        }
    }
}

// ============================================================================
// Feature schema
// ============================================================================

pub fn feature_schema_to_bytes(schema: &FeatureSchema, format: Format) -> Result<Vec<u8>, WriteError> {
    let doc = FeatureColumnsSchema::from(schema);
    match format {
        Format::Json => Ok(serde_json::to_vec_pretty(&doc)?),
        Format::Binary => native::encode(ArtifactKind::FeatureColumns, schema.len() as u32, 0, &doc),
    }
}

pub fn feature_schema_from_bytes(bytes: &[u8]) -> Result<FeatureSchema, ReadError> {
    let doc = if native::is_native(bytes) {
        native::decode::<FeatureColumnsSchema>(bytes, ArtifactKind::FeatureColumns)?.1
    } else {
        serde_json::from_slice::<FeatureColumnsJson>(bytes)?.into()
    };
    FeatureSchema::try_from(doc)
}

pub fn save_feature_schema(
    schema: &FeatureSchema,
    path: impl AsRef<Path>,
    format: Format,
) -> Result<(), WriteError> {
    std::fs::write(path, feature_schema_to_bytes(schema, format)?)?;
    Ok(())
}

pub fn load_feature_schema(path: impl AsRef<Path>) -> Result<FeatureSchema, ReadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    require_native_for_jim(path, &bytes)?;
    feature_schema_from_bytes(&bytes)
}

// ============================================================================
// Stage models
// ============================================================================

pub fn stage_model_to_bytes(model: &ForestStageModel, format: Format) -> Result<Vec<u8>, WriteError> {
    let doc = StageModelSchema::from(model);
    match format {
        Format::Json => Ok(serde_json::to_vec_pretty(&doc)?),
        Format::Binary => native::encode(
            ArtifactKind::StageModel,
            model.input_layout().n_features() as u32,
            model.forest().n_groups(),
            &doc,
        ),
    }
}

pub fn stage_model_from_bytes(bytes: &[u8]) -> Result<ForestStageModel, ReadError> {
    let doc: StageModelSchema = if native::is_native(bytes) {
        let (header, doc): (_, StageModelSchema) = native::decode(bytes, ArtifactKind::StageModel)?;
        if header.num_features as usize != doc.inputs.len() {
            return Err(ReadError::Corrupt(format!(
                "header declares {} inputs, payload has {}",
                header.num_features,
                doc.inputs.len()
            )));
        }
        if header.num_groups != doc.forest.n_groups {
            return Err(ReadError::Corrupt(format!(
                "header declares {} output groups, payload has {}",
                header.num_groups, doc.forest.n_groups
            )));
        }
        doc
    } else {
        serde_json::from_slice(bytes)?
    };
    ForestStageModel::try_from(doc)
}

pub fn save_stage_model(
    model: &ForestStageModel,
    path: impl AsRef<Path>,
    format: Format,
) -> Result<(), WriteError> {
    std::fs::write(path, stage_model_to_bytes(model, format)?)?;
    Ok(())
}

pub fn load_stage_model(path: impl AsRef<Path>) -> Result<ForestStageModel, ReadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    require_native_for_jim(path, &bytes)?;
    stage_model_from_bytes(&bytes)
}

fn require_native_for_jim(path: &Path, bytes: &[u8]) -> Result<(), ReadError> {
    if Format::from_path(path) == Some(Format::Binary) && !native::is_native(bytes) {
        if bytes.len() < native::MAGIC.len() && native::MAGIC.starts_with(bytes) {
            return Err(ReadError::Truncated {
                expected: native::HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        return Err(ReadError::NotAnArtifact);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("m/model.jim")), Some(Format::Binary));
        assert_eq!(Format::from_path(Path::new("m/model.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("m/model")), None);
    }

    #[test]
    fn feature_schema_both_formats() {
        let schema = FeatureSchema::new(["posting_year", "city"]).unwrap();
        for format in [Format::Json, Format::Binary] {
            let bytes = feature_schema_to_bytes(&schema, format).unwrap();
            assert_eq!(feature_schema_from_bytes(&bytes).unwrap(), schema);
        }
        let bare = feature_schema_from_bytes(br#"["posting_year", "city"]"#).unwrap();
        assert_eq!(bare, schema);
    }

    #[test]
    fn invalid_feature_columns_fail() {
        assert!(matches!(
            feature_schema_from_bytes(br#"{"columns": ["a", "a"]}"#),
            Err(ReadError::Schema(_))
        ));
        assert!(matches!(
            feature_schema_from_bytes(b"not json"),
            Err(ReadError::Json(_))
        ));
    }

    #[test]
    fn header_counts_must_match_the_payload() {
        let model = crate::testing::adoption_model().unwrap();
        let doc = StageModelSchema::from(&model);
        let n_features = model.input_layout().n_features() as u32;
        let n_groups = model.forest().n_groups();

        let good = native::encode(ArtifactKind::StageModel, n_features, n_groups, &doc).unwrap();
        assert!(stage_model_from_bytes(&good).is_ok());

        let wrong_groups = native::encode(ArtifactKind::StageModel, n_features, n_groups + 1, &doc).unwrap();
        match stage_model_from_bytes(&wrong_groups) {
            Err(ReadError::Corrupt(msg)) => assert!(msg.contains("output groups")),
            other => panic!("unexpected {other:?}"),
        }

        let wrong_features = native::encode(ArtifactKind::StageModel, n_features + 1, n_groups, &doc).unwrap();
        assert!(matches!(stage_model_from_bytes(&wrong_features), Err(ReadError::Corrupt(_))));
    }
}
