//! Startup resource lifecycle
//!
//! The classifier, label table and reference store are loaded together into
//! one immutable [`ResourceBundle`]. [`ResourceManager`] publishes the bundle
//! only once all three loaded, so readers never observe a partial state.

use crate::classifier::Classifier;
use crate::config::{InputSize, ResourceConfig};
use crate::error::{ClassifyError, LoadError};
use crate::labels::LabelTable;
use crate::pipeline::{self, PredictionResult};
use crate::preprocess::ImageTensor;
use crate::reference::ReferenceDataStore;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Everything a classification needs, shared read-only between requests
pub struct ResourceBundle {
    classifier: Arc<dyn Classifier>,
    labels: LabelTable,
    reference: ReferenceDataStore,
    input_size: InputSize,
}

impl ResourceBundle {
    /// Assemble a bundle, checking that the classifier and label table agree
    /// on the size of the label space when the classifier declares it.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        labels: LabelTable,
        reference: ReferenceDataStore,
        input_size: InputSize,
    ) -> Result<Self, LoadError> {
        if let Some(outputs) = classifier.output_len()
            && outputs != labels.len()
        {
            return Err(LoadError::LabelMismatch {
                labels: labels.len(),
                outputs,
            });
        }

        Ok(Self {
            classifier,
            labels,
            reference,
            input_size,
        })
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn reference(&self) -> &ReferenceDataStore {
        &self.reference
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }

    /// Run one inference on a blank input so artifact problems surface at
    /// startup instead of on the first request
    fn warm_up(&self) -> Result<(), LoadError> {
        let scores = self
            .classifier
            .infer(&ImageTensor::zeros(self.input_size))
            .map_err(|e| LoadError::Model {
                path: self.classifier.describe().into(),
                message: format!("warm-up inference failed: {}", e.0),
            })?;

        if scores.len() != self.labels.len() {
            return Err(LoadError::LabelMismatch {
                labels: self.labels.len(),
                outputs: scores.len(),
            });
        }
        Ok(())
    }
}

/// Per-resource readiness as reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub model_loaded: bool,
    pub labels_loaded: bool,
    pub weights_loaded: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.model_loaded && self.labels_loaded && self.weights_loaded
    }
}

/// Owns the process-wide bundle and its readiness
pub struct ResourceManager {
    config: ResourceConfig,
    bundle: RwLock<Option<Arc<ResourceBundle>>>,
}

impl ResourceManager {
    pub fn new(config: ResourceConfig) -> Self {
        Self {
            config,
            bundle: RwLock::new(None),
        }
    }

    /// Manager that is ready from the start, for embedding a prebuilt bundle
    pub fn with_bundle(config: ResourceConfig, bundle: ResourceBundle) -> Self {
        Self {
            config,
            bundle: RwLock::new(Some(Arc::new(bundle))),
        }
    }

    /// Load all resources using the ONNX Runtime classifier
    #[cfg(feature = "onnx")]
    pub fn initialize(&self) -> Result<(), LoadError> {
        self.initialize_with(|config| {
            let classifier =
                crate::classifier::onnx::OnnxClassifier::load(&config.model_path, config.input_size)?;
            Ok(Arc::new(classifier) as Arc<dyn Classifier>)
        })
    }

    /// Load all resources with a caller supplied classifier loader.
    ///
    /// On failure the manager is left without a bundle, even if one was
    /// published by an earlier call.
    pub fn initialize_with<F>(&self, load_classifier: F) -> Result<(), LoadError>
    where
        F: FnOnce(&ResourceConfig) -> Result<Arc<dyn Classifier>, LoadError>,
    {
        match self.load(load_classifier) {
            Ok(bundle) => {
                tracing::info!(
                    classifier = %bundle.classifier.describe(),
                    labels = bundle.labels.len(),
                    weights = bundle.reference.len(),
                    "Model and reference data loaded"
                );
                *self.bundle.write() = Some(Arc::new(bundle));
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load resources");
                *self.bundle.write() = None;
                Err(e)
            }
        }
    }

    fn load<F>(&self, load_classifier: F) -> Result<ResourceBundle, LoadError>
    where
        F: FnOnce(&ResourceConfig) -> Result<Arc<dyn Classifier>, LoadError>,
    {
        let config = &self.config;

        let labels =
            LabelTable::from_path(&config.labels_path).map_err(|source| LoadError::Labels {
                path: config.labels_path.clone(),
                source,
            })?;
        let reference = ReferenceDataStore::from_path(&config.weights_path).map_err(|source| {
            LoadError::Weights {
                path: config.weights_path.clone(),
                source,
            }
        })?;
        if reference.is_empty() {
            tracing::warn!(
                path = %config.weights_path.display(),
                "Weight table is empty, every prediction will report N/A"
            );
        }

        let classifier = load_classifier(config)?;
        let bundle = ResourceBundle::new(classifier, labels, reference, config.input_size)?;
        bundle.warm_up()?;
        Ok(bundle)
    }

    pub fn is_ready(&self) -> bool {
        self.bundle.read().is_some()
    }

    pub fn health(&self) -> HealthReport {
        let loaded = self.is_ready();
        HealthReport {
            model_loaded: loaded,
            labels_loaded: loaded,
            weights_loaded: loaded,
        }
    }

    /// The published bundle, or `NotReady` before a successful load
    pub fn bundle(&self) -> Result<Arc<ResourceBundle>, ClassifyError> {
        self.bundle.read().clone().ok_or(ClassifyError::NotReady)
    }

    /// Classify using the published bundle; never touches the classifier
    /// when resources are not loaded
    pub fn classify(&self, bytes: &[u8]) -> Result<PredictionResult, ClassifyError> {
        let bundle = self.bundle()?;
        pipeline::classify(&bundle, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::classifier::ScoreVector;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Constant(Vec<f32>);

    impl Classifier for Constant {
        fn infer(&self, _: &ImageTensor) -> Result<ScoreVector, InferenceError> {
            Ok(self.0.clone())
        }
    }

    fn table(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn manager(labels: &NamedTempFile, weights: &NamedTempFile) -> ResourceManager {
        ResourceManager::new(ResourceConfig {
            model_path: "unused.onnx".into(),
            labels_path: labels.path().to_path_buf(),
            weights_path: weights.path().to_path_buf(),
            input_size: InputSize::new(8, 8),
        })
    }

    #[test]
    fn starts_not_ready() {
        let manager = ResourceManager::new(ResourceConfig::default());
        assert!(!manager.is_ready());
        assert!(!manager.health().is_healthy());
        assert!(matches!(manager.bundle(), Err(ClassifyError::NotReady)));
    }

    #[test]
    fn loads_all_three_resources() {
        let labels = table("label\napple\nbanana\n");
        let weights = table("name;min;avg;max\napple;100;150;200\n");
        let manager = manager(&labels, &weights);

        manager
            .initialize_with(|_| Ok(Arc::new(Constant(vec![0.2, 0.8])) as Arc<dyn Classifier>))
            .unwrap();

        assert!(manager.is_ready());
        let health = manager.health();
        assert!(health.model_loaded && health.labels_loaded && health.weights_loaded);
        assert_eq!(manager.bundle().unwrap().labels().len(), 2);
    }

    #[test]
    fn empty_weight_table_still_loads() {
        let labels = table("label\napple\n");
        let weights = table("");
        let manager = manager(&labels, &weights);

        manager
            .initialize_with(|_| Ok(Arc::new(Constant(vec![1.0])) as Arc<dyn Classifier>))
            .unwrap();
        assert!(manager.health().is_healthy());
    }

    #[test]
    fn missing_label_file_leaves_manager_unset() {
        let weights = table("name;min;avg;max\n");
        let manager = ResourceManager::new(ResourceConfig {
            labels_path: "no/such/labels.csv".into(),
            weights_path: weights.path().to_path_buf(),
            ..ResourceConfig::default()
        });

        let mut classifier_loaded = false;
        let err = manager
            .initialize_with(|_| {
                classifier_loaded = true;
                Ok(Arc::new(Constant(vec![1.0])) as Arc<dyn Classifier>)
            })
            .unwrap_err();

        assert!(matches!(err, LoadError::Labels { .. }));
        assert!(!classifier_loaded);
        assert!(!manager.is_ready());
    }

    #[test]
    fn output_size_mismatch_is_a_load_error() {
        let labels = table("label\napple\nbanana\ncarrot\n");
        let weights = table("name;min;avg;max\n");
        let manager = manager(&labels, &weights);

        let err = manager
            .initialize_with(|_| Ok(Arc::new(Constant(vec![0.5, 0.5])) as Arc<dyn Classifier>))
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::LabelMismatch {
                labels: 3,
                outputs: 2
            }
        ));
        assert!(!manager.is_ready());
    }

    #[test]
    fn failed_reload_clears_previous_bundle() {
        let labels = table("label\napple\n");
        let weights = table("name;min;avg;max\n");
        let manager = manager(&labels, &weights);

        manager
            .initialize_with(|_| Ok(Arc::new(Constant(vec![1.0])) as Arc<dyn Classifier>))
            .unwrap();
        assert!(manager.is_ready());

        let result = manager.initialize_with(|config| {
            Err(LoadError::Model {
                path: config.model_path.clone(),
                message: "corrupt".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(!manager.is_ready());
    }
}
