//! Export one scored record to JSON.
//!
//! The export is meant to be easy to consume in downstream scripts: the raw
//! record, the decision, and either the attribution or the reason it is missing.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::Assessment;
use crate::domain::{ApplicantRecord, AttributionResult, PredictionOutcome};
use crate::error::AppError;

/// On-disk shape of `risk predict --export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFile {
    pub tool: String,
    pub scored_at: DateTime<Utc>,
    pub record: ApplicantRecord,
    pub outcome: PredictionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<AttributionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_error: Option<String>,
}

impl AssessmentFile {
    pub fn from_assessment(assessment: &Assessment, scored_at: DateTime<Utc>) -> Self {
        let (attribution, attribution_error) = match &assessment.attribution {
            Ok(a) => (Some(a.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            tool: "risk".to_string(),
            scored_at,
            record: assessment.record.clone(),
            outcome: assessment.outcome,
            attribution,
            attribution_error,
        }
    }
}

/// Write an assessment JSON file, stamped with the current UTC time.
pub fn write_assessment_json(path: &Path, assessment: &Assessment) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;

    let export = AssessmentFile::from_assessment(assessment, Utc::now());
    serde_json::to_writer_pretty(file, &export)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;

    tracing::info!(path = %path.display(), "assessment exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::EncodedRecord;
    use crate::domain::RiskLabel;
    use crate::error::AttributionError;

    fn assessment(attribution: Result<AttributionResult, AttributionError>) -> Assessment {
        Assessment {
            record: ApplicantRecord::default(),
            encoded: EncodedRecord {
                values: vec![],
                columns: vec![],
            },
            outcome: PredictionOutcome {
                label: RiskLabel::Good,
                probability: 0.25,
                raw_score: -1.0986,
            },
            attribution,
        }
    }

    #[test]
    fn export_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.json");
        let a = assessment(Ok(AttributionResult {
            baseline: -0.9,
            contributions: vec![],
        }));
        write_assessment_json(&path, &a).unwrap();

        let back: AssessmentFile = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(back.tool, "risk");
        assert_eq!(back.record, a.record);
        assert_eq!(back.outcome, a.outcome);
        assert_eq!(back.attribution.unwrap().baseline, -0.9);
        assert!(back.attribution_error.is_none());
    }

    #[test]
    fn attribution_error_is_exported_as_text() {
        let a = assessment(Err(AttributionError::UnsupportedModel { model: "logistic" }));
        let file = AssessmentFile::from_assessment(&a, Utc::now());
        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("attribution").is_none());
        assert!(json["attribution_error"].as_str().unwrap().contains("logistic"));
        assert_eq!(json["record"]["saving_accounts"], "little");
    }
}
