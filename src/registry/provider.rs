//! Model providers
//!
//! A provider hands out the estimators available for a disease. A provider
//! that has nothing for a disease returns an empty list and the scorer
//! substitutes the fallback, so a missing or broken artifact never stops
//! the pipeline from starting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::algorithm::prediction::estimator::{Estimator, LogisticArtifact, LogisticEstimator};
use crate::error::util::safe_read_to_string;
use crate::utils::logging::log_warning;

/// Source of pre-trained estimators
pub trait ModelProvider {
    /// Estimators for `disease`, which will be fed vectors aligned with
    /// `features`
    fn estimators(&self, disease: &str, features: &[String]) -> Vec<Arc<dyn Estimator>>;
}

/// Provider with nothing registered; every ensemble disease falls back
#[derive(Debug, Clone, Default)]
pub struct NoModels;

impl ModelProvider for NoModels {
    fn estimators(&self, _disease: &str, _features: &[String]) -> Vec<Arc<dyn Estimator>> {
        Vec::new()
    }
}

/// Estimators registered in memory by disease name
#[derive(Debug, Clone, Default)]
pub struct InMemoryModelProvider {
    models: FxHashMap<String, Vec<Arc<dyn Estimator>>>,
}

impl InMemoryModelProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an estimator for a disease, appended after existing ones
    #[must_use]
    pub fn with_estimator(mut self, disease: &str, estimator: Arc<dyn Estimator>) -> Self {
        self.insert(disease, estimator);
        self
    }

    pub fn insert(&mut self, disease: &str, estimator: Arc<dyn Estimator>) {
        self.models
            .entry(disease.to_string())
            .or_default()
            .push(estimator);
    }
}

impl ModelProvider for InMemoryModelProvider {
    fn estimators(&self, disease: &str, _features: &[String]) -> Vec<Arc<dyn Estimator>> {
        self.models.get(disease).cloned().unwrap_or_default()
    }
}

/// Directory-name form of a disease name: lowercase, anything that is not
/// alphanumeric becomes `_`
#[must_use]
pub fn disease_slug(disease: &str) -> String {
    disease
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Loads logistic artifacts from `<root>/<disease slug>/*.json`
#[derive(Debug, Clone)]
pub struct ArtifactModelProvider {
    root: PathBuf,
}

impl ArtifactModelProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_paths(&self, disease: &str) -> Vec<PathBuf> {
        let dir = self.root.join(disease_slug(disease));
        let Ok(entries) = std::fs::read_dir(&dir) else {
            log::debug!("No artifact directory for {disease} at {}", dir.display());
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .sorted()
            .collect()
    }

    fn load_artifact(path: &Path, features: &[String]) -> Option<LogisticEstimator> {
        let text = match safe_read_to_string(path, "loading estimator artifact") {
            Ok(text) => text,
            Err(e) => {
                log_warning(&format!("Skipping unreadable artifact ({e})"), Some(path));
                return None;
            }
        };

        let artifact: LogisticArtifact = match serde_json::from_str(&text) {
            Ok(artifact) => artifact,
            Err(e) => {
                log_warning(&format!("Skipping malformed artifact ({e})"), Some(path));
                return None;
            }
        };

        let estimator = match LogisticEstimator::from_artifact(artifact) {
            Ok(estimator) => estimator,
            Err(e) => {
                log_warning(&format!("Skipping invalid artifact ({e})"), Some(path));
                return None;
            }
        };

        if estimator.input_len() != features.len() {
            log_warning(
                &format!(
                    "Skipping artifact expecting {} features, disease has {}",
                    estimator.input_len(),
                    features.len()
                ),
                Some(path),
            );
            return None;
        }

        Some(estimator)
    }
}

impl ModelProvider for ArtifactModelProvider {
    fn estimators(&self, disease: &str, features: &[String]) -> Vec<Arc<dyn Estimator>> {
        let estimators: Vec<Arc<dyn Estimator>> = self
            .artifact_paths(disease)
            .iter()
            .filter_map(|path| Self::load_artifact(path, features))
            .map(|estimator| Arc::new(estimator) as Arc<dyn Estimator>)
            .collect();

        log::info!(
            "Loaded {} estimator(s) for {disease} from {}",
            estimators.len(),
            self.root.display()
        );
        estimators
    }
}
