use std::sync::Arc;

use crate::utils::{ConstantEstimator, FailingEstimator, healthy_rows, screening_row};
use medpredict::models::{DiseaseDefinition, RegistryDefinition};
use medpredict::{
    DiseaseRegistry, FieldValue, InMemoryModelProvider, NoModels, PredictionEngine,
    PredictionError, Row, Value,
};

fn stroke_definition() -> RegistryDefinition {
    RegistryDefinition {
        diseases: vec![DiseaseDefinition::Ensemble {
            name: "Stroke Risk".to_string(),
            features: vec!["Age".to_string(), "Blood Pressure".to_string()],
        }],
    }
}

fn mixed_definition() -> RegistryDefinition {
    let mut definition = medpredict::registry::builtin_definition();
    definition.diseases.extend(stroke_definition().diseases);
    definition
}

#[test]
fn test_screening_scenarios() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::builtin(&NoModels)?;
    let engine = PredictionEngine::with_max_rows(&registry, 500);

    let rows = vec![
        screening_row(55.0, 28.0, 250.0, 150.0),
        Row::from_pairs([("Age", 22), ("BMI", 17)]),
        screening_row(40.0, 22.0, 200.0, 120.0),
        screening_row(60.0, 35.0, 100.0, 100.0),
    ];
    let result = engine.run(&rows)?;

    let labels: Vec<_> = result.iter().map(|r| r.label().unwrap()).collect();
    assert_eq!(
        labels,
        vec!["Heart Disease, Hypertension", "Asthma", "None", "Diabetes"]
    );

    // No ensemble diseases, no risk fields
    assert!(result.iter().all(|r| r.risks.is_empty()));
    Ok(())
}

#[test]
fn test_patient_ids_follow_input_order() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::builtin(&NoModels)?;
    let engine = PredictionEngine::with_max_rows(&registry, 500);

    let result = engine.run(&healthy_rows(5))?;
    let ids: Vec<_> = result.iter().map(|r| r.patient_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn test_row_limit_boundary() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::builtin(&NoModels)?;
    let engine = PredictionEngine::with_max_rows(&registry, 500);

    assert_eq!(engine.run(&healthy_rows(500))?.len(), 500);

    let err = engine.run(&healthy_rows(501)).unwrap_err();
    assert!(matches!(
        err,
        PredictionError::RowLimitExceeded { rows: 501, max: 500 }
    ));
    assert!(err.is_batch_fatal());
    Ok(())
}

#[test]
fn test_row_limit_checked_before_scoring() {
    // A failing estimator would abort on the first row; the row limit must win
    let provider = InMemoryModelProvider::new().with_estimator("Stroke Risk", Arc::new(FailingEstimator));
    let registry = DiseaseRegistry::from_definition(&stroke_definition(), &provider).unwrap();
    let engine = PredictionEngine::with_max_rows(&registry, 2);

    let err = engine.run(&healthy_rows(3)).unwrap_err();
    assert!(matches!(err, PredictionError::RowLimitExceeded { .. }));
}

#[test]
fn test_ensemble_mean_of_two_estimators() -> medpredict::Result<()> {
    let provider = InMemoryModelProvider::new()
        .with_estimator("Stroke Risk", ConstantEstimator::arc("a", 0.2))
        .with_estimator("Stroke Risk", ConstantEstimator::arc("b", 0.35));
    let registry = DiseaseRegistry::from_definition(&stroke_definition(), &provider)?;
    let engine = PredictionEngine::with_max_rows(&registry, 10);

    let result = engine.run(&healthy_rows(1))?;
    assert_eq!(
        result.records[0].risk("Stroke Risk"),
        Some(&FieldValue::Risk(27.5))
    );
    assert!(result.records[0].prediction.is_none());
    assert!(result.diagnostics.fallback_diseases.is_empty());
    Ok(())
}

#[test]
fn test_fallback_without_estimators() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::from_definition(&stroke_definition(), &NoModels)?;
    let engine = PredictionEngine::with_max_rows(&registry, 10);

    let rows = vec![
        screening_row(40.0, 22.0, 200.0, 120.0),
        screening_row(40.0, 22.0, 200.0, 42.5),
    ];
    let result = engine.run(&rows)?;

    // Fallback reads the last feature, Blood Pressure
    assert_eq!(result.records[0].risk("Stroke Risk"), Some(&FieldValue::Risk(100.0)));
    assert_eq!(result.records[1].risk("Stroke Risk"), Some(&FieldValue::Risk(42.5)));
    assert_eq!(result.diagnostics.fallback_diseases, vec!["Stroke Risk".to_string()]);

    for record in &result {
        let score = record.risk("Stroke Risk").and_then(FieldValue::risk).unwrap();
        assert!((0.0..=100.0).contains(&score));
    }
    Ok(())
}

#[test]
fn test_missing_feature_is_recovered() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::from_definition(&mixed_definition(), &NoModels)?;
    let engine = PredictionEngine::with_max_rows(&registry, 10);

    let rows = vec![
        Row::from_pairs([("Age", 22), ("BMI", 17)]),
        Row::from_pairs([("Age", Value::from(70)), ("Blood Pressure", Value::Missing)]),
        screening_row(40.0, 22.0, 200.0, 90.0),
    ];
    let result = engine.run(&rows)?;

    assert_eq!(result.len(), 3);
    assert!(result.records[0].risk("Stroke Risk").unwrap().is_unavailable());
    assert_eq!(result.records[0].label(), Some("Asthma"));
    assert!(result.records[1].risk("Stroke Risk").unwrap().is_unavailable());
    assert_eq!(result.records[2].risk("Stroke Risk"), Some(&FieldValue::Risk(90.0)));

    assert_eq!(result.diagnostics.missing_columns(), 1);
    assert_eq!(result.diagnostics.invalid_values(), 1);
    assert_eq!(result.diagnostics.issues[0].patient_id, 1);
    assert_eq!(result.diagnostics.issues[1].patient_id, 2);
    Ok(())
}

#[test]
fn test_estimator_failure_aborts_batch() {
    let provider = InMemoryModelProvider::new().with_estimator("Stroke Risk", Arc::new(FailingEstimator));
    let registry = DiseaseRegistry::from_definition(&stroke_definition(), &provider).unwrap();
    let engine = PredictionEngine::with_max_rows(&registry, 10);

    let err = engine.run(&healthy_rows(2)).unwrap_err();
    assert!(
        matches!(err, PredictionError::Estimator { ref disease, .. } if disease == "Stroke Risk")
    );
}

#[test]
fn test_out_of_range_probability_aborts_batch() {
    let provider =
        InMemoryModelProvider::new().with_estimator("Stroke Risk", ConstantEstimator::arc("bad", 1.5));
    let registry = DiseaseRegistry::from_definition(&stroke_definition(), &provider).unwrap();
    let engine = PredictionEngine::with_max_rows(&registry, 10);

    assert!(matches!(
        engine.run(&healthy_rows(1)),
        Err(PredictionError::Estimator { .. })
    ));
}

#[test]
fn test_runs_are_deterministic() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::from_definition(&mixed_definition(), &NoModels)?;
    let engine = PredictionEngine::with_max_rows(&registry, 10);

    let rows = vec![
        screening_row(55.0, 28.0, 250.0, 150.0),
        screening_row(23.0, 31.0, 180.0, 77.7),
    ];
    assert_eq!(engine.run(&rows)?, engine.run(&rows)?);
    Ok(())
}
