use std::sync::Arc;

use medpredict::models::{Comparison, DiseaseDefinition, RegistryDefinition};
use medpredict::registry::provider::ArtifactModelProvider;
use medpredict::{
    BatchProcessor, DiseaseRegistry, FallbackEstimator, InMemoryModelProvider, NoModels,
    PipelineConfig, PredictionError,
};

const REGISTRY_JSON: &str = r#"{
  "diseases": [
    { "mode": "rules", "name": "Diabetes",
      "conditions": [{ "feature": "BMI", "op": ">", "threshold": 30 }] },
    { "mode": "rules", "name": "Frailty",
      "conditions": [
        { "feature": "Age", "op": ">=", "threshold": 80 },
        { "feature": "BMI", "op": "<=", "threshold": 18.5 }
      ] },
    { "mode": "ensemble", "name": "Stroke Risk",
      "features": ["Age", "Blood Pressure"] }
  ]
}"#;

fn config_error(result: medpredict::Result<DiseaseRegistry>) -> String {
    match result {
        Err(PredictionError::Config(message)) => message,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn test_builtin_priority_order() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::builtin(&NoModels)?;
    assert_eq!(
        registry.categorical_labels(),
        vec!["Heart Disease", "Diabetes", "Asthma", "Hypertension", "None"]
    );
    assert_eq!(registry.ensemble_specs().count(), 0);
    assert_eq!(
        registry.get("Heart Disease").map(|s| s.features.clone()),
        Some(vec!["Age".to_string(), "Cholesterol".to_string()])
    );
    Ok(())
}

#[test]
fn test_load_json_definition() -> medpredict::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.json");
    std::fs::write(&path, REGISTRY_JSON)?;

    let registry = DiseaseRegistry::load(&path, &NoModels)?;
    assert_eq!(registry.specs().len(), 3);
    assert_eq!(
        registry.categorical_labels(),
        vec!["Diabetes", "Frailty", "None"]
    );

    let stroke = registry.get("Stroke Risk").unwrap();
    assert!(!stroke.is_rule());
    let ensembles: Vec<_> = registry.ensembles().map(|(spec, _)| spec.name.as_str()).collect();
    assert_eq!(ensembles, vec!["Stroke Risk"]);
    assert_eq!(stroke.features, vec!["Age", "Blood Pressure"]);
    Ok(())
}

#[test]
fn test_definition_round_trips_operators() {
    let definition: RegistryDefinition = serde_json::from_str(REGISTRY_JSON).unwrap();
    let DiseaseDefinition::Rules { conditions, .. } = &definition.diseases[1] else {
        panic!("expected a rule disease");
    };
    assert_eq!(conditions[0].op, Comparison::AtLeast);
    assert_eq!(conditions[1].op, Comparison::AtMost);
}

#[test]
fn test_rejects_invalid_definitions() {
    let parse = |json: &str| -> RegistryDefinition { serde_json::from_str(json).unwrap() };

    let empty = parse(r#"{ "diseases": [] }"#);
    assert!(config_error(DiseaseRegistry::from_definition(&empty, &NoModels)).contains("no diseases"));

    let duplicate = parse(
        r#"{ "diseases": [
            { "mode": "ensemble", "name": "Stroke", "features": ["Age"] },
            { "mode": "ensemble", "name": "Stroke", "features": ["BMI"] } ] }"#,
    );
    assert!(config_error(DiseaseRegistry::from_definition(&duplicate, &NoModels)).contains("duplicate"));

    let reserved = parse(r#"{ "diseases": [ { "mode": "ensemble", "name": "None", "features": ["Age"] } ] }"#);
    assert!(config_error(DiseaseRegistry::from_definition(&reserved, &NoModels)).contains("reserved"));

    let no_features = parse(r#"{ "diseases": [ { "mode": "ensemble", "name": "Stroke", "features": [] } ] }"#);
    config_error(DiseaseRegistry::from_definition(&no_features, &NoModels));

    let no_conditions = parse(r#"{ "diseases": [ { "mode": "rules", "name": "Gout", "conditions": [] } ] }"#);
    config_error(DiseaseRegistry::from_definition(&no_conditions, &NoModels));

    // A joined label must split back into known names
    let separator = parse(
        r#"{ "diseases": [ { "mode": "rules", "name": "Heart, Lung",
            "conditions": [{ "feature": "Age", "op": ">", "threshold": 50 }] } ] }"#,
    );
    assert!(config_error(DiseaseRegistry::from_definition(&separator, &NoModels)).contains("separator"));

    let sentinel = parse(
        r#"{ "diseases": [ { "mode": "rules", "name": "N/A",
            "conditions": [{ "feature": "Age", "op": ">", "threshold": 50 }] } ] }"#,
    );
    assert!(config_error(DiseaseRegistry::from_definition(&sentinel, &NoModels)).contains("reserved"));
}

#[test]
fn test_rejects_names_of_output_columns() -> medpredict::Result<()> {
    let config = PipelineConfig::default();
    for name in ["Patient ID", "Prediction"] {
        let definition = RegistryDefinition {
            diseases: vec![DiseaseDefinition::Ensemble {
                name: name.to_string(),
                features: vec!["Age".to_string()],
            }],
        };
        let registry = DiseaseRegistry::from_definition(&definition, &NoModels)?;

        assert!(matches!(
            registry.check_output_columns(&config),
            Err(PredictionError::Config(_))
        ));
        assert!(BatchProcessor::new(Arc::new(registry), config.clone()).is_err());
    }

    let builtin = DiseaseRegistry::builtin(&NoModels)?;
    builtin.check_output_columns(&config)?;
    Ok(())
}

#[test]
fn test_malformed_json_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(&path, "{ \"diseases\": [ { \"mode\": \"magic\" } ] }").unwrap();

    assert!(matches!(
        DiseaseRegistry::load(&path, &NoModels),
        Err(PredictionError::Json(_))
    ));
}

#[test]
fn test_provider_supplies_ensemble_estimators() -> medpredict::Result<()> {
    let definition: RegistryDefinition = serde_json::from_str(REGISTRY_JSON)?;
    let provider = InMemoryModelProvider::new()
        .with_estimator("Stroke Risk", Arc::new(FallbackEstimator));

    let registry = DiseaseRegistry::from_definition(&definition, &provider)?;
    assert!(registry.get("Stroke Risk").is_some());
    Ok(())
}

#[test]
fn test_artifact_directory_feeds_registry() -> medpredict::Result<()> {
    let root = tempfile::tempdir()?;
    let dir = root.path().join("stroke_risk");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(
        dir.join("model.json"),
        r#"{ "name": "lr", "coefficients": [0.0, 0.0], "intercept": 0.0 }"#,
    )?;

    let definition: RegistryDefinition = serde_json::from_str(REGISTRY_JSON)?;
    let provider = ArtifactModelProvider::new(root.path());
    let registry = DiseaseRegistry::from_definition(&definition, &provider)?;

    let engine = medpredict::PredictionEngine::with_max_rows(&registry, 1);
    let row = medpredict::Row::from_pairs([("Age", 70), ("BMI", 24), ("Blood Pressure", 130)]);
    let result = engine.run(&[row])?;

    // sigmoid(0) = 0.5
    assert_eq!(
        result.records[0].risk("Stroke Risk"),
        Some(&medpredict::FieldValue::Risk(50.0))
    );
    assert!(result.diagnostics.fallback_diseases.is_empty());
    Ok(())
}
