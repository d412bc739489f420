//! Fitted binary classifier.
//!
//! Two model families can be loaded:
//!
//! - `tree_ensemble`: gradient-boosted regression trees summed in log-odds space
//! - `logistic`: a linear model in log-odds space (scoreable, not attributable)
//!
//! Both expose the same primitive: a raw log-odds score for an encoded vector.

use serde::{Deserialize, Serialize};

use crate::artifacts::{ArtifactHeader, CLASSIFIER_FORMAT};
use crate::error::PipelineError;

/// Relative tolerance for `cover(split) == cover(left) + cover(right)`.
const COVER_TOLERANCE: f64 = 1e-6;

/// A single tree node. Children always sit at a higher index than their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Go `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Training samples (or hessian mass) that reached this node.
        cover: f64,
    },
    Leaf { value: f64, cover: f64 },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }
}

/// A regression tree stored as a flat node array; index 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Index of the leaf reached by `x`.
    pub fn leaf_index(&self, x: &[f64]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        match &self.nodes[self.leaf_index(x)] {
            Node::Leaf { value, .. } => *value,
            Node::Split { .. } => unreachable!("leaf_index always stops at a leaf"),
        }
    }

    /// Cover-weighted mean leaf value: the tree's expected output.
    pub fn expected_value(&self) -> f64 {
        // Children follow parents, so a reverse sweep sees children first.
        let mut expected = vec![0.0; self.nodes.len()];
        for idx in (0..self.nodes.len()).rev() {
            expected[idx] = match &self.nodes[idx] {
                Node::Leaf { value, .. } => *value,
                Node::Split { left, right, .. } => {
                    let cl = self.nodes[*left].cover();
                    let cr = self.nodes[*right].cover();
                    (cl * expected[*left] + cr * expected[*right]) / (cl + cr)
                }
            };
        }
        expected[0]
    }

    pub fn depth(&self) -> usize {
        let mut depth = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            max = max.max(depth[idx]);
            if let Node::Split { left, right, .. } = node {
                depth[*left] = depth[idx] + 1;
                depth[*right] = depth[idx] + 1;
            }
        }
        max
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let mut parents = vec![0usize; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !(cover.is_finite() && cover > 0.0) {
                return Err(format!("node {idx} has non-positive cover {cover}"));
            }
            match node {
                Node::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} has a non-finite value"));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature}, but there are only {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx} has a NaN threshold"));
                    }
                    for &child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has out-of-order child {child}"));
                        }
                        parents[child] += 1;
                    }
                    let children = self.nodes[*left].cover() + self.nodes[*right].cover();
                    if (children - cover).abs() > COVER_TOLERANCE * cover.max(1.0) {
                        return Err(format!(
                            "node {idx} cover {cover} differs from its children's {children}"
                        ));
                    }
                }
            }
        }
        for (idx, count) in parents.iter().enumerate().skip(1) {
            if *count != 1 {
                return Err(format!("node {idx} is referenced {count} times"));
            }
        }
        Ok(())
    }
}

/// Binary gradient-boosted ensemble: `raw = base_score + Σ tree(x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn raw_score(&self, x: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Expected raw output over the training distribution (via covers).
    pub fn expected_value(&self) -> f64 {
        self.base_score + self.trees.iter().map(Tree::expected_value).sum::<f64>()
    }
}

/// Linear log-odds model: `raw = intercept + w · x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticModel {
    pub fn raw_score(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    TreeEnsemble(TreeEnsemble),
    Logistic(LogisticModel),
}

impl ClassifierModel {
    /// Human-readable label for terminal output.
    pub fn display_name(&self) -> &'static str {
        match self {
            ClassifierModel::TreeEnsemble(_) => "tree ensemble",
            ClassifierModel::Logistic(_) => "logistic",
        }
    }
}

/// Immutable binary classifier over the transform's output space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedClassifier {
    #[serde(flatten)]
    pub header: ArtifactHeader,
    /// Encoded column names the model was fitted on, in order.
    pub feature_names: Vec<String>,
    pub model: ClassifierModel,
}

impl FittedClassifier {
    pub fn new(feature_names: Vec<String>, model: ClassifierModel) -> Self {
        Self {
            header: ArtifactHeader::current(CLASSIFIER_FORMAT),
            feature_names,
            model,
        }
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Raw (log-odds) score for an encoded vector.
    pub fn raw_score(&self, x: &[f64]) -> Result<f64, PipelineError> {
        if x.len() != self.n_features() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        let raw = match &self.model {
            ClassifierModel::TreeEnsemble(ensemble) => ensemble.raw_score(x),
            ClassifierModel::Logistic(model) => model.raw_score(x),
        };
        if !raw.is_finite() {
            return Err(PipelineError::NonFiniteScore);
        }
        Ok(raw)
    }

    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.n_features();
        if n == 0 {
            return Err("classifier declares no features".to_string());
        }
        match &self.model {
            ClassifierModel::TreeEnsemble(ensemble) => {
                if !ensemble.base_score.is_finite() {
                    return Err("non-finite base_score".to_string());
                }
                if ensemble.trees.is_empty() {
                    return Err("ensemble has no trees".to_string());
                }
                for (i, tree) in ensemble.trees.iter().enumerate() {
                    tree.validate(n).map_err(|e| format!("tree {i}: {e}"))?;
                }
            }
            ClassifierModel::Logistic(model) => {
                if model.coefficients.len() != n {
                    return Err(format!(
                        "{} coefficients for {n} features",
                        model.coefficients.len()
                    ));
                }
                if !(model.intercept.is_finite() && model.coefficients.iter().all(|w| w.is_finite())) {
                    return Err("non-finite logistic parameters".to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64) -> Node {
        Node::Split {
            feature,
            threshold,
            left,
            right,
            cover,
        }
    }

    fn leaf(value: f64, cover: f64) -> Node {
        Node::Leaf { value, cover }
    }

    fn stump() -> Tree {
        Tree {
            nodes: vec![split(0, 0.5, 1, 2, 10.0), leaf(-1.0, 6.0), leaf(2.0, 4.0)],
        }
    }

    #[test]
    fn traversal_goes_left_on_equal() {
        let t = stump();
        assert_eq!(t.predict(&[0.5]), -1.0);
        assert_eq!(t.predict(&[0.51]), 2.0);
    }

    #[test]
    fn expected_value_weights_by_cover() {
        let t = stump();
        assert!((t.expected_value() - 0.2).abs() < 1e-12);
        assert_eq!(t.depth(), 1);
        assert_eq!(t.leaf_count(), 2);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let c = FittedClassifier::new(
            vec!["a".into(), "b".into()],
            ClassifierModel::TreeEnsemble(TreeEnsemble {
                base_score: 0.0,
                trees: vec![stump()],
            }),
        );
        assert_eq!(
            c.raw_score(&[1.0]).unwrap_err(),
            PipelineError::ShapeMismatch { expected: 2, actual: 1 }
        );
        assert!(c.raw_score(&[0.0, 0.0]).is_ok());
    }

    #[test]
    fn validation_catches_broken_trees() {
        let n = 1;
        let cyclic = Tree {
            nodes: vec![split(0, 0.5, 0, 2, 10.0), leaf(1.0, 6.0), leaf(1.0, 4.0)],
        };
        assert!(cyclic.validate(n).is_err());

        let bad_cover = Tree {
            nodes: vec![split(0, 0.5, 1, 2, 10.0), leaf(1.0, 6.0), leaf(1.0, 5.0)],
        };
        assert!(bad_cover.validate(n).unwrap_err().contains("cover"));

        let bad_feature = Tree {
            nodes: vec![split(3, 0.5, 1, 2, 10.0), leaf(1.0, 6.0), leaf(1.0, 4.0)],
        };
        assert!(bad_feature.validate(n).is_err());

        let shared_child = Tree {
            nodes: vec![
                split(0, 0.5, 1, 2, 10.0),
                split(0, 0.2, 3, 3, 5.0),
                leaf(0.0, 5.0),
                leaf(0.0, 2.5),
            ],
        };
        assert!(shared_child.validate(n).is_err());

        assert!(stump().validate(n).is_ok());
    }

    #[test]
    fn logistic_scores_linearly() {
        let c = FittedClassifier::new(
            vec!["a".into(), "b".into()],
            ClassifierModel::Logistic(LogisticModel {
                intercept: -1.0,
                coefficients: vec![2.0, 0.5],
            }),
        );
        assert!(c.validate().is_ok());
        assert!((c.raw_score(&[1.0, 2.0]).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn serde_reads_tagged_model() {
        let json = r#"{
            "format": "credit-risk.classifier",
            "version": 1,
            "feature_names": ["Age"],
            "model": {
                "kind": "tree_ensemble",
                "base_score": -0.5,
                "trees": [{"nodes": [
                    {"type": "split", "feature": 0, "threshold": 0.0, "left": 1, "right": 2, "cover": 2.0},
                    {"type": "leaf", "value": 0.1, "cover": 1.0},
                    {"type": "leaf", "value": -0.1, "cover": 1.0}
                ]}]
            }
        }"#;
        let c: FittedClassifier = serde_json::from_str(json).unwrap();
        assert!(c.validate().is_ok());
        assert!((c.raw_score(&[-1.0]).unwrap() - (-0.4)).abs() < 1e-12);
    }
}
