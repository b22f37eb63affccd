use crate::utils::screening_row;
use medpredict::models::ResultSet;
use medpredict::{
    DiseaseRegistry, FieldValue, NoModels, PredictionEngine, PredictionError, PredictionRecord,
    histogram, paginate, paginate_results,
};

fn labelled(labels: &[&str]) -> ResultSet {
    ResultSet {
        records: labels
            .iter()
            .enumerate()
            .map(|(i, label)| PredictionRecord {
                patient_id: i + 1,
                risks: Vec::new(),
                prediction: Some(FieldValue::Label((*label).to_string())),
            })
            .collect(),
        diagnostics: Default::default(),
    }
}

#[test]
fn test_page_slices_cover_every_record_once() {
    let items: Vec<usize> = (0..23).collect();
    let page_size = 10;

    let (_, first) = paginate(&items, 1, page_size);
    assert_eq!(first.total, 3);

    let mut seen = Vec::new();
    for page in 1..=first.total {
        let (slice, info) = paginate(&items, page, page_size);
        assert!(slice.len() <= page_size);
        assert_eq!(info.current, page);
        assert_eq!(info.prev, (page > 1).then(|| page - 1));
        assert_eq!(info.next, (page < info.total).then(|| page + 1));
        seen.extend_from_slice(slice);
    }
    assert_eq!(seen, items);
}

#[test]
fn test_empty_result_set_has_no_pages() {
    let result_set = ResultSet::default();
    let (slice, info) = paginate_results(&result_set, 1, 10);
    assert!(slice.is_empty());
    assert_eq!(info.total, 0);
    assert_eq!(info.prev, None);
    assert_eq!(info.next, None);
}

#[test]
fn test_exact_multiple_of_page_size() {
    let items: Vec<usize> = (0..20).collect();
    let (slice, info) = paginate(&items, 2, 10);
    assert_eq!(slice.len(), 10);
    assert_eq!(info.total, 2);
    assert_eq!(info.next, None);
}

#[test]
fn test_histogram_sum_equals_record_count() -> medpredict::Result<()> {
    let registry = DiseaseRegistry::builtin(&NoModels)?;
    let engine = PredictionEngine::with_max_rows(&registry, 100);

    // Each row matches at most one rule
    let rows = vec![
        screening_row(55.0, 25.0, 250.0, 120.0),
        screening_row(40.0, 33.0, 200.0, 120.0),
        screening_row(25.0, 17.0, 150.0, 110.0),
        screening_row(45.0, 25.0, 200.0, 160.0),
        screening_row(40.0, 22.0, 200.0, 120.0),
        screening_row(41.0, 23.0, 190.0, 118.0),
    ];
    let result = engine.run(&rows)?;
    let counts = histogram(&result, &registry.categorical_labels())?;

    assert_eq!(counts.total(), result.len());
    assert_eq!(counts.get("Heart Disease"), Some(1));
    assert_eq!(counts.get("Diabetes"), Some(1));
    assert_eq!(counts.get("Asthma"), Some(1));
    assert_eq!(counts.get("Hypertension"), Some(1));
    assert_eq!(counts.get("None"), Some(2));
    assert_eq!(counts.unavailable(), 0);
    Ok(())
}

#[test]
fn test_histogram_counts_each_joined_label() -> medpredict::Result<()> {
    let labels = ["Heart Disease", "Diabetes", "Asthma", "Hypertension", "None"];
    let result_set = labelled(&["Heart Disease, Hypertension", "Diabetes, Hypertension", "None"]);

    let counts = histogram(&result_set, &labels)?;
    assert_eq!(counts.get("Hypertension"), Some(2));
    assert_eq!(counts.get("Asthma"), Some(0));
    assert_eq!(counts.total(), 5);
    Ok(())
}

#[test]
fn test_histogram_rejects_unknown_label() {
    let labels = ["Diabetes", "None"];
    let result_set = labelled(&["Diabetes", "Gout"]);

    let err = histogram(&result_set, &labels).unwrap_err();
    assert!(matches!(err, PredictionError::UnknownLabel(ref token) if token == "Gout"));
}

#[test]
fn test_histogram_keeps_unavailable_apart() -> medpredict::Result<()> {
    let labels = ["Diabetes", "None"];
    let mut result_set = labelled(&["Diabetes", "None"]);
    result_set.records[1].prediction = Some(FieldValue::Unavailable);

    let counts = histogram(&result_set, &labels)?;
    assert_eq!(counts.total(), 1);
    assert_eq!(counts.unavailable(), 1);
    Ok(())
}
