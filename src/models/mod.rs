//! Data model of the prediction pipeline
//!
//! Input rows, declarative disease definitions and the prediction output.

pub mod disease;
pub mod record;
pub mod row;

pub use disease::{Comparison, Condition, DiseaseDefinition, RegistryDefinition};
pub use record::{BatchDiagnostics, FieldValue, PredictionRecord, ResultSet, RowIssue};
pub use row::{Row, RowSchema, Value};
