//! Shared scoring pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! validate record -> encode -> score -> threshold -> attribute
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use crate::artifacts::{ArtifactStore, EncodedRecord, FittedClassifier, FittedTransform};
use crate::domain::{ApplicantRecord, AttributionResult, PredictionOutcome, RiskLabel};
use crate::error::{AttributionError, PipelineError};
use crate::math::sigmoid;

/// Probability above which a record is labelled `Bad`.
///
/// Equivalent to an argmax over `[1 - p, p]`; a tie resolves to `Good`.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// All computed outputs of one recomputation.
///
/// Attribution has its own failure boundary: when it fails, the prediction
/// is still valid and shown on its own.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub record: ApplicantRecord,
    pub encoded: EncodedRecord,
    pub outcome: PredictionOutcome,
    pub attribution: Result<AttributionResult, AttributionError>,
}

/// Score one record against the fitted artifacts.
pub fn predict(
    record: &ApplicantRecord,
    transform: &FittedTransform,
    classifier: &FittedClassifier,
) -> Result<PredictionOutcome, PipelineError> {
    record.validate()?;
    let encoded = transform.apply(record)?;
    predict_encoded(&encoded, classifier)
}

/// Score an already encoded record.
pub fn predict_encoded(
    encoded: &EncodedRecord,
    classifier: &FittedClassifier,
) -> Result<PredictionOutcome, PipelineError> {
    let raw_score = classifier.raw_score(&encoded.values)?;
    let probability = sigmoid(raw_score);
    let label = if probability > DECISION_THRESHOLD {
        RiskLabel::Bad
    } else {
        RiskLabel::Good
    };
    Ok(PredictionOutcome {
        label,
        probability,
        raw_score,
    })
}

/// Run the full pipeline for one record: prediction, then attribution.
pub fn assess(record: &ApplicantRecord, store: &ArtifactStore) -> Result<Assessment, PipelineError> {
    record.validate()?;
    let encoded = store.transform().apply(record)?;
    let outcome = predict_encoded(&encoded, store.classifier())?;

    let attribution = crate::explain::attribute(&encoded, store.classifier());
    if let Err(err) = &attribution {
        tracing::warn!(error = %err, "attribution unavailable; showing prediction only");
    }

    tracing::debug!(
        label = outcome.label.display_name(),
        probability = outcome.probability,
        raw_score = outcome.raw_score,
        "record scored"
    );

    Ok(Assessment {
        record: record.clone(),
        encoded,
        outcome,
        attribution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ClassifierModel, ColumnEncoder, LogisticModel, Node, Tree, TreeEnsemble, UnknownCategory};
    use crate::domain::{CheckingAccount, Field, Housing, JobLevel, Purpose, SavingAccounts, Sex};
    use crate::error::ValidationError;

    fn transform() -> FittedTransform {
        FittedTransform::new(vec![
            ColumnEncoder::Standard {
                field: Field::Duration,
                mean: 20.0,
                scale: 10.0,
            },
            ColumnEncoder::OneHot {
                field: Field::CheckingAccount,
                categories: vec!["little".into(), "moderate".into(), "no_info".into(), "rich".into()],
                handle_unknown: UnknownCategory::Error,
            },
        ])
    }

    fn tree_store() -> ArtifactStore {
        let t = transform();
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                    cover: 100.0,
                },
                Node::Leaf { value: -0.5, cover: 70.0 },
                Node::Split {
                    feature: 3,
                    threshold: 0.5,
                    left: 3,
                    right: 4,
                    cover: 30.0,
                },
                Node::Leaf { value: 1.5, cover: 20.0 },
                Node::Leaf { value: 0.2, cover: 10.0 },
            ],
        };
        let c = FittedClassifier::new(
            t.feature_names(),
            ClassifierModel::TreeEnsemble(TreeEnsemble {
                base_score: -0.4,
                trees: vec![tree],
            }),
        );
        ArtifactStore::from_parts(t, c).unwrap()
    }

    fn scenario_record() -> ApplicantRecord {
        ApplicantRecord {
            age: 30,
            job: JobLevel::Skilled,
            sex: Sex::Male,
            housing: Housing::Own,
            saving_accounts: SavingAccounts::Little,
            checking_account: CheckingAccount::NoInfo,
            credit_amount: 5000.0,
            duration: 24,
            purpose: Purpose::Car,
        }
    }

    #[test]
    fn label_follows_threshold() {
        let store = tree_store();
        let short = ApplicantRecord {
            duration: 12,
            ..scenario_record()
        };
        let out = predict(&short, store.transform(), store.classifier()).unwrap();
        assert_eq!(out.label, RiskLabel::Good);
        assert!((out.raw_score - (-0.9)).abs() < 1e-12);

        let long = ApplicantRecord {
            duration: 60,
            checking_account: CheckingAccount::Little,
            ..scenario_record()
        };
        let out = predict(&long, store.transform(), store.classifier()).unwrap();
        assert_eq!(out.label, RiskLabel::Bad);
        assert!(out.probability > DECISION_THRESHOLD);
    }

    #[test]
    fn exact_half_is_good() {
        let t = FittedTransform::new(vec![ColumnEncoder::Passthrough { field: Field::Job }]);
        let c = FittedClassifier::new(
            t.feature_names(),
            ClassifierModel::Logistic(LogisticModel {
                intercept: -2.0,
                coefficients: vec![1.0],
            }),
        );
        let out = predict(&scenario_record(), &t, &c).unwrap();
        assert_eq!(out.probability, 0.5);
        assert_eq!(out.label, RiskLabel::Good);
    }

    #[test]
    fn out_of_domain_record_is_a_pipeline_error() {
        let store = tree_store();
        let record = ApplicantRecord {
            duration: 0,
            ..scenario_record()
        };
        let err = predict(&record, store.transform(), store.classifier()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidRecord(ValidationError::OutOfRange { field: Field::Duration, .. })
        ));
        assert!(assess(&record, &store).is_err());
    }

    #[test]
    fn mismatched_artifacts_fail_the_request() {
        let t = transform();
        let c = FittedClassifier::new(
            vec!["only".into()],
            ClassifierModel::Logistic(LogisticModel {
                intercept: 0.0,
                coefficients: vec![1.0],
            }),
        );
        let err = predict(&scenario_record(), &t, &c).unwrap_err();
        assert_eq!(err, PipelineError::ShapeMismatch { expected: 1, actual: 5 });
    }

    #[test]
    fn assessment_attribution_adds_up() {
        let store = tree_store();
        let a = assess(&scenario_record(), &store).unwrap();
        let attribution = a.attribution.as_ref().unwrap();
        assert!((attribution.raw_output() - a.outcome.raw_score).abs() < 1e-9);
        assert_eq!(a.encoded.width(), 5);
    }

    #[test]
    fn attribution_failure_keeps_prediction() {
        let t = transform();
        let c = FittedClassifier::new(
            t.feature_names(),
            ClassifierModel::Logistic(LogisticModel {
                intercept: 0.0,
                coefficients: vec![0.1; 5],
            }),
        );
        let store = ArtifactStore::from_parts(t, c).unwrap();
        let a = assess(&scenario_record(), &store).unwrap();
        assert!((0.0..=1.0).contains(&a.outcome.probability));
        assert!(matches!(a.attribution, Err(AttributionError::UnsupportedModel { .. })));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let store = tree_store();
        let first = assess(&scenario_record(), &store).unwrap();
        let second = assess(&scenario_record(), &store).unwrap();
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.attribution, second.attribution);
        assert_eq!(first.outcome.probability.to_bits(), second.outcome.probability.to_bits());
    }
}
