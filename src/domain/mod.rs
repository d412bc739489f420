//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the applicant record and its per-field choice enums (`ApplicantRecord`, `Purpose`, ...)
//! - raw column names as the fitted transform knows them (`Field`)
//! - pipeline outputs (`PredictionOutcome`, `AttributionResult`)

pub mod types;

pub use types::*;
