//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use jobimpact::persist::Format;
use jobimpact::{testing, Orchestrator, PipelineConfig, RawParams};

/// Temporary model directory holding the synthetic artifacts.
pub struct ArtifactDir {
    pub dir: TempDir,
    pub written: Vec<PathBuf>,
}

impl ArtifactDir {
    pub fn new(format: Format) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let written = testing::demo_models()
            .expect("demo models")
            .write(dir.path(), format)
            .expect("write artifacts");
        Self { dir, written }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::builder()
            .model_dir(self.path())
            .build()
            .expect("valid config")
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::from_config(&self.config()).expect("load artifacts")
    }
}

/// Form defaults with `overrides` applied.
pub fn params(overrides: &[(&str, jobimpact::FeatureValue)]) -> RawParams {
    let mut params = testing::example_params();
    for (key, value) in overrides {
        params.insert(key.to_string(), value.clone());
    }
    params
}
