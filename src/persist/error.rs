//! Read/write errors for persisted artifacts.

use thiserror::Error;

use super::native::ArtifactKind;
use crate::encoding::EncodingError;
use crate::model::InvalidModelError;
use crate::schema::SchemaError;

/// Errors raised while writing an artifact.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding error: {0}")]
    Binary(#[from] postcard::Error),
}

/// Errors raised while reading an artifact.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary decoding error: {0}")]
    Binary(#[from] postcard::Error),

    #[error("not a jobimpact artifact")]
    NotAnArtifact,

    #[error("artifact format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("artifact kind mismatch: expected {expected:?}, got {actual:?}")]
    KindMismatch {
        expected: ArtifactKind,
        actual: ArtifactKind,
    },

    #[error("corrupt artifact: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Model(#[from] InvalidModelError),

    #[error("invalid input layout: {0}")]
    Encoding(#[from] EncodingError),

    #[error("invalid feature columns: {0}")]
    Schema(#[from] SchemaError),
}
