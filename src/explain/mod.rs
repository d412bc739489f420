//! Attribution step: which encoded features pushed a prediction toward
//! "bad" or "good".
//!
//! Attribution is tied to the classifier's internal structure: only tree
//! ensembles are supported, using exact TreeSHAP (no sampling), so results are
//! deterministic for a fixed record and model. Values are in log-odds, the
//! same space as `PredictionOutcome::raw_score`.

use rayon::prelude::*;

use crate::artifacts::{ClassifierModel, EncodedRecord, FittedClassifier, TreeEnsemble};
use crate::domain::{AttributionResult, FeatureContribution};
use crate::error::AttributionError;

pub mod tree_shap;

pub use tree_shap::tree_shap;

/// Attribute one encoded record's raw score to its features.
pub fn attribute(
    encoded: &EncodedRecord,
    classifier: &FittedClassifier,
) -> Result<AttributionResult, AttributionError> {
    let ensemble = match &classifier.model {
        ClassifierModel::TreeEnsemble(ensemble) => ensemble,
        other => {
            return Err(AttributionError::UnsupportedModel {
                model: other.display_name(),
            });
        }
    };

    let n = classifier.n_features();
    if encoded.width() != n || encoded.columns.len() != n {
        return Err(AttributionError::ShapeMismatch {
            expected: n,
            actual: encoded.width(),
        });
    }

    let phi = ensemble_shap(ensemble, &encoded.values);
    let contributions = encoded
        .columns
        .iter()
        .zip(&encoded.values)
        .zip(phi)
        .map(|((column, &value), contribution)| FeatureContribution {
            feature: column.name.clone(),
            field: column.field,
            value,
            contribution,
        })
        .collect();

    let result = AttributionResult {
        baseline: ensemble.expected_value(),
        contributions,
    };
    tracing::debug!(
        baseline = result.baseline,
        raw_output = result.raw_output(),
        trees = ensemble.trees.len(),
        "attribution computed"
    );
    Ok(result)
}

/// Sum per-tree SHAP vectors.
///
/// Trees are explained in parallel, then added in tree order so the floating
/// point result does not depend on scheduling.
fn ensemble_shap(ensemble: &TreeEnsemble, x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let per_tree: Vec<Vec<f64>> = ensemble
        .trees
        .par_iter()
        .map(|tree| tree_shap(tree, x, n))
        .collect();

    let mut phi = vec![0.0; n];
    for tree_phi in &per_tree {
        for (acc, v) in phi.iter_mut().zip(tree_phi) {
            *acc += v;
        }
    }
    phi
}
