//! Disease registry
//!
//! The registry is the process-wide, read-only set of [`DiseaseSpec`]s the
//! engine runs. It is built once at startup from a [`RegistryDefinition`]
//! and a [`ModelProvider`], then shared by reference (or `Arc`) with every
//! batch. Nothing in it is mutated after construction.

pub mod provider;

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::algorithm::prediction::scorer::{DiseaseScorer, EnsembleScorer, RuleScorer};
use crate::config::{LABEL_SEPARATOR, NO_DIAGNOSIS_LABEL, PipelineConfig, UNAVAILABLE_SENTINEL};
use crate::error::util::safe_read_to_string;
use crate::error::{PredictionError, Result};
use crate::models::{Comparison, Condition, DiseaseDefinition, RegistryDefinition};
use provider::ModelProvider;

/// One configured disease
#[derive(Debug, Clone)]
pub struct DiseaseSpec {
    pub name: String,
    /// Feature columns in the order the scorer expects them
    pub features: Vec<String>,
    pub scorer: DiseaseScorer,
}

impl DiseaseSpec {
    #[must_use]
    pub const fn is_rule(&self) -> bool {
        self.scorer.is_rule()
    }
}

/// Read-only collection of disease specs
#[derive(Debug, Clone)]
pub struct DiseaseRegistry {
    specs: Vec<DiseaseSpec>,
}

impl DiseaseRegistry {
    /// Build a registry from a definition, asking `provider` for the
    /// estimators of every ensemble disease.
    ///
    /// # Errors
    ///
    /// [`PredictionError::Config`] if the definition is empty, names repeat,
    /// a name is blank, a name is the no-diagnosis label or the unavailable
    /// sentinel, a name contains the label separator, a rule
    /// has no conditions or an ensemble has no features.
    pub fn from_definition(
        definition: &RegistryDefinition,
        provider: &dyn ModelProvider,
    ) -> Result<Self> {
        if definition.diseases.is_empty() {
            return Err(PredictionError::Config(
                "registry defines no diseases".to_string(),
            ));
        }

        let mut seen = FxHashSet::default();
        let mut specs = Vec::with_capacity(definition.diseases.len());

        for disease in &definition.diseases {
            let name = disease.name().trim();
            if name.is_empty() {
                return Err(PredictionError::Config("disease with empty name".to_string()));
            }
            if name == NO_DIAGNOSIS_LABEL || name == UNAVAILABLE_SENTINEL {
                return Err(PredictionError::Config(format!(
                    "disease name {name} is reserved"
                )));
            }
            if name.contains(LABEL_SEPARATOR) {
                return Err(PredictionError::Config(format!(
                    "disease name {name} contains the label separator {LABEL_SEPARATOR:?}"
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(PredictionError::Config(format!("duplicate disease {name}")));
            }

            let features = disease.features();
            let scorer = match disease {
                DiseaseDefinition::Rules { conditions, .. } => {
                    DiseaseScorer::Rule(RuleScorer::new(name, conditions.clone(), &features)?)
                }
                DiseaseDefinition::Ensemble { .. } => {
                    if features.is_empty() {
                        return Err(PredictionError::Config(format!(
                            "ensemble disease {name} lists no features"
                        )));
                    }
                    let estimators = provider.estimators(name, &features);
                    DiseaseScorer::Ensemble(EnsembleScorer::new(name, estimators))
                }
            };

            specs.push(DiseaseSpec {
                name: name.to_string(),
                features,
                scorer,
            });
        }

        log::info!(
            "Disease registry ready: {} rule disease(s), {} ensemble disease(s)",
            specs.iter().filter(|s| s.is_rule()).count(),
            specs.iter().filter(|s| !s.is_rule()).count()
        );

        Ok(Self { specs })
    }

    /// Load a JSON registry definition from disk
    pub fn load(path: &Path, provider: &dyn ModelProvider) -> Result<Self> {
        let text = safe_read_to_string(path, "loading disease registry")?;
        let definition: RegistryDefinition = serde_json::from_str(&text)?;
        Self::from_definition(&definition, provider)
    }

    /// The built-in screening rules
    pub fn builtin(provider: &dyn ModelProvider) -> Result<Self> {
        Self::from_definition(&builtin_definition(), provider)
    }

    /// Reject disease names that would collide with the fixed output columns
    /// of `config`
    pub fn check_output_columns(&self, config: &PipelineConfig) -> Result<()> {
        let reserved = [&config.patient_id_column, &config.prediction_column];
        match self.specs.iter().find(|s| reserved.contains(&&s.name)) {
            Some(spec) => Err(PredictionError::Config(format!(
                "disease name {} collides with an output column",
                spec.name
            ))),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn specs(&self) -> &[DiseaseSpec] {
        &self.specs
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DiseaseSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Rule diseases in priority order
    pub fn rule_specs(&self) -> impl Iterator<Item = &DiseaseSpec> {
        self.specs.iter().filter(|s| s.is_rule())
    }

    /// Ensemble diseases in registry order
    pub fn ensemble_specs(&self) -> impl Iterator<Item = &DiseaseSpec> {
        self.ensembles().map(|(spec, _)| spec)
    }

    /// Ensemble diseases paired with their scorers, in registry order
    pub fn ensembles(&self) -> impl Iterator<Item = (&DiseaseSpec, &EnsembleScorer)> {
        self.specs.iter().filter_map(|spec| match &spec.scorer {
            DiseaseScorer::Ensemble(ensemble) => Some((spec, ensemble)),
            DiseaseScorer::Rule(_) => None,
        })
    }

    #[must_use]
    pub fn has_rules(&self) -> bool {
        self.rule_specs().next().is_some()
    }

    /// Every label the categorical field can contain: rule names in
    /// priority order followed by the no-diagnosis label. Empty when there
    /// are no rule diseases.
    #[must_use]
    pub fn categorical_labels(&self) -> Vec<String> {
        if !self.has_rules() {
            return Vec::new();
        }
        self.rule_specs()
            .map(|s| s.name.clone())
            .chain(std::iter::once(NO_DIAGNOSIS_LABEL.to_string()))
            .collect()
    }
}

/// Screening rules shipped with the crate, in priority order
#[must_use]
pub fn builtin_definition() -> RegistryDefinition {
    use Comparison::{GreaterThan, LessThan};

    let rule = |name: &str, conditions: Vec<Condition>| DiseaseDefinition::Rules {
        name: name.to_string(),
        conditions,
    };

    RegistryDefinition {
        diseases: vec![
            rule(
                "Heart Disease",
                vec![
                    Condition::new("Age", GreaterThan, 50.0),
                    Condition::new("Cholesterol", GreaterThan, 240.0),
                ],
            ),
            rule("Diabetes", vec![Condition::new("BMI", GreaterThan, 30.0)]),
            rule(
                "Asthma",
                vec![
                    Condition::new("Age", LessThan, 30.0),
                    Condition::new("BMI", LessThan, 18.0),
                ],
            ),
            rule(
                "Hypertension",
                vec![Condition::new("Blood Pressure", GreaterThan, 140.0)],
            ),
        ],
    }
}
