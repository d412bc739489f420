//! Fitted feature transform.
//!
//! Maps one `ApplicantRecord` to the fixed-width numeric vector the
//! classifier was trained on. Column order is encoder order, then category
//! order within a one-hot block; the classifier artifact records the same
//! names so the pairing can be checked at load time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::artifacts::{ArtifactHeader, TRANSFORM_FORMAT};
use crate::domain::{ApplicantRecord, Field};
use crate::error::PipelineError;

/// What a one-hot encoder does with a category it was not fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategory {
    /// Fail the request with `PipelineError::UnknownCategory`.
    #[default]
    Error,
    /// Emit an all-zero block (the record matches no fitted category).
    Ignore,
}

/// One fitted column encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoder", rename_all = "snake_case")]
pub enum ColumnEncoder {
    /// `(x - mean) / scale`.
    Standard { field: Field, mean: f64, scale: f64 },
    /// Numeric value copied as-is.
    Passthrough { field: Field },
    /// One indicator column per fitted category.
    OneHot {
        field: Field,
        categories: Vec<String>,
        #[serde(default)]
        handle_unknown: UnknownCategory,
    },
}

impl ColumnEncoder {
    pub fn field(&self) -> Field {
        match self {
            ColumnEncoder::Standard { field, .. }
            | ColumnEncoder::Passthrough { field }
            | ColumnEncoder::OneHot { field, .. } => *field,
        }
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        match self {
            ColumnEncoder::Standard { .. } | ColumnEncoder::Passthrough { .. } => 1,
            ColumnEncoder::OneHot { categories, .. } => categories.len(),
        }
    }

    fn push_columns(&self, out: &mut Vec<FeatureColumn>) {
        let field = self.field();
        match self {
            ColumnEncoder::Standard { .. } | ColumnEncoder::Passthrough { .. } => {
                out.push(FeatureColumn {
                    name: field.column_name().to_string(),
                    field,
                });
            }
            ColumnEncoder::OneHot { categories, .. } => {
                for category in categories {
                    out.push(FeatureColumn {
                        name: format!("{}_{category}", field.column_name()),
                        field,
                    });
                }
            }
        }
    }

    fn encode_into(&self, record: &ApplicantRecord, out: &mut Vec<f64>) -> Result<(), PipelineError> {
        match self {
            ColumnEncoder::Standard { field, mean, scale } => {
                let x = numeric(record, *field)?;
                out.push(finite(*field, (x - mean) / scale)?);
            }
            ColumnEncoder::Passthrough { field } => {
                let x = numeric(record, *field)?;
                out.push(finite(*field, x)?);
            }
            ColumnEncoder::OneHot {
                field,
                categories,
                handle_unknown,
            } => {
                let value = record.category(*field).ok_or_else(|| PipelineError::Encoding {
                    field: *field,
                    reason: "field has no categorical value".to_string(),
                })?;
                let hit = categories.iter().position(|c| *c == value);
                if hit.is_none() {
                    match handle_unknown {
                        UnknownCategory::Error => {
                            return Err(PipelineError::UnknownCategory {
                                field: *field,
                                value: value.into_owned(),
                            });
                        }
                        UnknownCategory::Ignore => {
                            tracing::warn!(
                                field = %field,
                                category = %value,
                                "unknown category encoded as all zeros"
                            );
                        }
                    }
                }
                out.extend((0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), String> {
        let field = self.field();
        match self {
            ColumnEncoder::Standard { mean, scale, .. } => {
                if !field.accepts_numeric() {
                    return Err(format!("standard encoder on categorical field '{field}'"));
                }
                if !mean.is_finite() {
                    return Err(format!("non-finite mean for '{field}'"));
                }
                if !(scale.is_finite() && *scale != 0.0) {
                    return Err(format!("scale for '{field}' must be finite and non-zero"));
                }
            }
            ColumnEncoder::Passthrough { .. } => {
                if !field.accepts_numeric() {
                    return Err(format!("passthrough encoder on categorical field '{field}'"));
                }
            }
            ColumnEncoder::OneHot { categories, .. } => {
                if !field.accepts_categorical() {
                    return Err(format!("one-hot encoder on numeric field '{field}'"));
                }
                if categories.is_empty() {
                    return Err(format!("no categories for '{field}'"));
                }
                let mut seen = HashSet::new();
                for c in categories {
                    if !seen.insert(c.as_str()) {
                        return Err(format!("duplicate category '{c}' for '{field}'"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn numeric(record: &ApplicantRecord, field: Field) -> Result<f64, PipelineError> {
    record.numeric(field).ok_or_else(|| PipelineError::Encoding {
        field,
        reason: "field has no numeric value".to_string(),
    })
}

fn finite(field: Field, v: f64) -> Result<f64, PipelineError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PipelineError::Encoding {
            field,
            reason: format!("encoded value {v} is not finite"),
        })
    }
}

/// Name and source field of one encoded column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub field: Field,
}

/// A record after the transform: values aligned with their column labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord {
    pub values: Vec<f64>,
    pub columns: Vec<FeatureColumn>,
}

impl EncodedRecord {
    pub fn width(&self) -> usize {
        self.values.len()
    }
}

/// Parameter-frozen mapping from raw fields to the classifier's feature space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    #[serde(flatten)]
    pub header: ArtifactHeader,
    pub columns: Vec<ColumnEncoder>,
}

impl FittedTransform {
    pub fn new(columns: Vec<ColumnEncoder>) -> Self {
        Self {
            header: ArtifactHeader::current(TRANSFORM_FORMAT),
            columns,
        }
    }

    /// Total number of output columns.
    pub fn width(&self) -> usize {
        self.columns.iter().map(ColumnEncoder::width).sum()
    }

    pub fn feature_columns(&self) -> Vec<FeatureColumn> {
        let mut out = Vec::with_capacity(self.width());
        for encoder in &self.columns {
            encoder.push_columns(&mut out);
        }
        out
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.feature_columns().into_iter().map(|c| c.name).collect()
    }

    /// Encode one record.
    ///
    /// Does not check field domains; `pipeline::predict` does that first.
    pub fn apply(&self, record: &ApplicantRecord) -> Result<EncodedRecord, PipelineError> {
        let mut values = Vec::with_capacity(self.width());
        for encoder in &self.columns {
            encoder.encode_into(record, &mut values)?;
        }
        Ok(EncodedRecord {
            values,
            columns: self.feature_columns(),
        })
    }

    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("transform has no column encoders".to_string());
        }
        let mut fields = HashSet::new();
        for encoder in &self.columns {
            encoder.validate()?;
            if !fields.insert(encoder.field()) {
                return Err(format!("field '{}' is encoded more than once", encoder.field()));
            }
        }
        Ok(())
    }
}
