//! Result aggregation for reporting
//!
//! Pagination of a result set and per-label counts of the categorical field.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::config::LABEL_SEPARATOR;
use crate::error::{PredictionError, Result};
use crate::models::{FieldValue, PredictionRecord, ResultSet};

/// Position of one page within a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number
    pub current: usize,
    pub page_size: usize,
    /// Number of pages, `ceil(len / page_size)`
    pub total: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// Slice out one page.
///
/// Page numbers start at 1; 0 is read as 1. A page past the end yields an
/// empty slice. `page_size` must be at least 1, a zero page size is read as 1.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> (&[T], Pagination) {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len().div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());

    let pagination = Pagination {
        current: page,
        page_size,
        total,
        prev: (page > 1).then(|| page - 1),
        next: (page < total).then(|| page + 1),
    };

    (&items[start..end], pagination)
}

/// Page through the records of a result set
pub fn paginate_results(
    result_set: &ResultSet,
    page: usize,
    page_size: usize,
) -> (&[PredictionRecord], Pagination) {
    paginate(&result_set.records, page, page_size)
}

/// Label counts of the categorical field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistogramCounts {
    /// Counts in known-label order
    counts: Vec<(String, usize)>,
    /// Records whose categorical field could not be computed
    unavailable: usize,
}

impl HistogramCounts {
    /// All known labels at zero
    pub fn with_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            counts: labels.iter().map(|l| (l.as_ref().to_string(), 0)).collect(),
            unavailable: 0,
        }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, count)| *count)
    }

    /// Sum over all label counts
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    #[must_use]
    pub const fn unavailable(&self) -> usize {
        self.unavailable
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }

    /// Count one categorical value
    pub fn add(&mut self, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Label(joined) => {
                for token in joined.split(LABEL_SEPARATOR) {
                    let slot = self
                        .counts
                        .iter_mut()
                        .find(|(known, _)| known == token)
                        .ok_or_else(|| PredictionError::UnknownLabel(token.to_string()))?;
                    slot.1 += 1;
                }
            }
            FieldValue::Unavailable => self.unavailable += 1,
            FieldValue::Risk(score) => {
                return Err(PredictionError::UnknownLabel(score.to_string()));
            }
        }
        Ok(())
    }
}

/// Serialized as an object in label order
impl Serialize for HistogramCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (label, count) in &self.counts {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Count the categorical labels of a result set.
///
/// Each record contributes one count per joined label. Records without a
/// categorical field are skipped.
///
/// # Errors
///
/// [`PredictionError::UnknownLabel`] for a label not in `known_labels`.
pub fn histogram<S: AsRef<str>>(
    result_set: &ResultSet,
    known_labels: &[S],
) -> Result<HistogramCounts> {
    let mut counts = HistogramCounts::with_labels(known_labels);
    for prediction in result_set.iter().filter_map(|r| r.prediction.as_ref()) {
        counts.add(prediction)?;
    }

    if counts.unavailable > 0 {
        log::warn!(
            "{} record(s) have no categorical prediction and are not counted",
            counts.unavailable
        );
    }
    Ok(counts)
}
