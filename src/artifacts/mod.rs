//! Artifact store: the fitted transform and classifier.
//!
//! Both artifacts are JSON files produced by an offline training step. Each
//! carries a small envelope (`format` + `version`) which is checked before the
//! body is parsed, so an artifact from an incompatible release is reported as
//! such instead of as a generic parse error.
//!
//! The store is loaded once at startup and only ever read afterwards.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactLoadError;

pub mod classifier;
pub mod transform;

pub use classifier::*;
pub use transform::*;

pub const TRANSFORM_FORMAT: &str = "credit-risk.transform";
pub const CLASSIFIER_FORMAT: &str = "credit-risk.classifier";
/// Artifact schema version this build reads and writes.
pub const SUPPORTED_VERSION: u32 = 1;

pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts";
pub const TRANSFORM_FILE: &str = "preprocessor.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";

/// Format tag and schema version shared by every artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format: String,
    pub version: u32,
}

impl ArtifactHeader {
    pub fn current(format: &str) -> Self {
        Self {
            format: format.to_string(),
            version: SUPPORTED_VERSION,
        }
    }
}

/// Where the two artifact files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub transform: PathBuf,
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    /// Both files inside one directory, using the default file names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            transform: dir.join(TRANSFORM_FILE),
            classifier: dir.join(CLASSIFIER_FILE),
        }
    }

    /// Resolve paths from explicit overrides, then the environment, then defaults.
    ///
    /// Environment variables (a `.env` file is honoured):
    /// - `RISK_ARTIFACT_DIR`: directory holding both default-named files
    /// - `RISK_TRANSFORM`, `RISK_CLASSIFIER`: individual file paths
    ///
    /// A directory given on the command line outranks every variable.
    pub fn resolve(
        dir: Option<&Path>,
        transform: Option<&Path>,
        classifier: Option<&Path>,
    ) -> Self {
        dotenvy::dotenv().ok();
        Self::resolve_with(dir, transform, classifier, |key| {
            std::env::var_os(key).map(PathBuf::from)
        })
    }

    fn resolve_with(
        dir: Option<&Path>,
        transform: Option<&Path>,
        classifier: Option<&Path>,
        env_path: impl Fn(&str) -> Option<PathBuf>,
    ) -> Self {
        let pick = |flag: Option<&Path>, var: &str, file: &str| -> PathBuf {
            if let Some(path) = flag {
                return path.to_path_buf();
            }
            if let Some(dir) = dir {
                return dir.join(file);
            }
            env_path(var)
                .or_else(|| env_path("RISK_ARTIFACT_DIR").map(|d| d.join(file)))
                .unwrap_or_else(|| Path::new(DEFAULT_ARTIFACT_DIR).join(file))
        };

        Self {
            transform: pick(transform, "RISK_TRANSFORM", TRANSFORM_FILE),
            classifier: pick(classifier, "RISK_CLASSIFIER", CLASSIFIER_FILE),
        }
    }
}

/// Both fitted artifacts, checked against each other.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    transform: FittedTransform,
    classifier: FittedClassifier,
    paths: Option<ArtifactPaths>,
}

impl ArtifactStore {
    /// Read, validate and pair the two artifacts.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactLoadError> {
        let transform: FittedTransform = read_artifact(&paths.transform, TRANSFORM_FORMAT)?;
        transform.validate().map_err(|reason| ArtifactLoadError::Invalid {
            path: paths.transform.clone(),
            reason,
        })?;

        let classifier: FittedClassifier = read_artifact(&paths.classifier, CLASSIFIER_FORMAT)?;
        classifier.validate().map_err(|reason| ArtifactLoadError::Invalid {
            path: paths.classifier.clone(),
            reason,
        })?;

        let mut store = Self::paired(transform, classifier)?;
        store.paths = Some(paths.clone());

        tracing::info!(
            transform = %paths.transform.display(),
            classifier = %paths.classifier.display(),
            features = store.classifier.n_features(),
            model = store.classifier.model.display_name(),
            "artifacts loaded"
        );
        Ok(store)
    }

    /// Pair in-memory artifacts. Runs the same structural checks as `load`.
    pub fn from_parts(
        transform: FittedTransform,
        classifier: FittedClassifier,
    ) -> Result<Self, ArtifactLoadError> {
        transform.validate().map_err(|reason| ArtifactLoadError::Rejected {
            artifact: "transform",
            reason,
        })?;
        classifier.validate().map_err(|reason| ArtifactLoadError::Rejected {
            artifact: "classifier",
            reason,
        })?;
        Self::paired(transform, classifier)
    }

    /// Both artifacts already validated; enforce the shared feature layout.
    fn paired(
        transform: FittedTransform,
        classifier: FittedClassifier,
    ) -> Result<Self, ArtifactLoadError> {
        check_layout(&transform, &classifier)?;
        Ok(Self {
            transform,
            classifier,
            paths: None,
        })
    }

    pub fn transform(&self) -> &FittedTransform {
        &self.transform
    }

    pub fn classifier(&self) -> &FittedClassifier {
        &self.classifier
    }

    /// Files the store was read from (`None` when built in memory).
    pub fn paths(&self) -> Option<&ArtifactPaths> {
        self.paths.as_ref()
    }

    pub fn into_parts(self) -> (FittedTransform, FittedClassifier) {
        (self.transform, self.classifier)
    }
}

/// Load both artifacts from durable storage.
pub fn load(paths: &ArtifactPaths) -> Result<(FittedTransform, FittedClassifier), ArtifactLoadError> {
    ArtifactStore::load(paths).map(ArtifactStore::into_parts)
}

fn check_layout(
    transform: &FittedTransform,
    classifier: &FittedClassifier,
) -> Result<(), ArtifactLoadError> {
    let names = transform.feature_names();
    if names.len() != classifier.feature_names.len() {
        return Err(ArtifactLoadError::Mismatch {
            reason: format!(
                "transform emits {} columns, classifier expects {}",
                names.len(),
                classifier.feature_names.len()
            ),
        });
    }
    if let Some((i, (ours, theirs))) = names
        .iter()
        .zip(&classifier.feature_names)
        .enumerate()
        .find(|(_, (a, b))| a != b)
    {
        return Err(ArtifactLoadError::Mismatch {
            reason: format!("column {i} is '{ours}' in the transform but '{theirs}' in the classifier"),
        });
    }
    Ok(())
}

/// Read one artifact, checking its envelope before the full parse.
fn read_artifact<T: DeserializeOwned>(path: &Path, expected: &'static str) -> Result<T, ArtifactLoadError> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ArtifactLoadError::Missing {
            path: path.to_path_buf(),
        },
        _ => ArtifactLoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let header: ArtifactHeader =
        serde_json::from_str(&text).map_err(|source| ArtifactLoadError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    if header.format != expected || header.version != SUPPORTED_VERSION {
        return Err(ArtifactLoadError::Incompatible {
            path: path.to_path_buf(),
            found: header.format,
            version: header.version,
            expected,
            supported: SUPPORTED_VERSION,
        });
    }

    tracing::debug!(path = %path.display(), format = expected, "parsing artifact");
    serde_json::from_str(&text).map_err(|source| ArtifactLoadError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
