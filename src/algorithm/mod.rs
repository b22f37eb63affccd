//! Prediction and aggregation algorithms
//!
//! - [`prediction`]: feature extraction, scoring and the batch engine
//! - [`aggregate`]: pagination and label histograms for reports

pub mod aggregate;
pub mod prediction;

pub use aggregate::{HistogramCounts, Pagination, histogram, paginate, paginate_results};
pub use prediction::PredictionEngine;
