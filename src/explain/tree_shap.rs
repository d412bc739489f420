//! Exact path-dependent TreeSHAP.
//!
//! For each tree we walk every root-to-leaf path once, maintaining the set of
//! unique features seen on the path together with the proportion of "feature
//! absent" (`zero_fraction`, by cover) and "feature present" (`one_fraction`,
//! by following `x`) mass that flows down it. `extend` adds a feature to the
//! path and updates the permutation weights; `unwind` removes one again when a
//! feature is split on a second time. At a leaf, each path feature receives
//! `leaf_value * (one - zero) * Σ weights` with that feature unwound.
//!
//! The result is the exact Shapley value under the cover-weighted conditional
//! expectation, so `expected_value + Σ phi == tree(x)` holds to rounding.

use crate::artifacts::{Node, Tree};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the sentinel root element.
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Per-feature SHAP values of `tree` at `x` (length `n_features`).
pub fn tree_shap(tree: &Tree, x: &[f64], n_features: usize) -> Vec<f64> {
    let mut phi = vec![0.0; n_features];
    recurse(tree, x, &mut phi, 0, Vec::new(), 1.0, 1.0, None);
    phi
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    x: &[f64],
    phi: &mut [f64],
    node: usize,
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    extend(&mut path, zero_fraction, one_fraction, feature);

    match &tree.nodes[node] {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let w = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        Node::Split {
            feature: split,
            threshold,
            left,
            right,
            cover,
        } => {
            let (hot, cold) = if x[*split] <= *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };

            // Undo an earlier split on the same feature so it is counted once.
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = path.iter().position(|el| el.feature == Some(*split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind(&mut path, k);
            }

            let hot_zero = tree.nodes[hot].cover() / cover;
            let cold_zero = tree.nodes[cold].cover() / cover;

            recurse(
                tree,
                x,
                phi,
                hot,
                path.clone(),
                hot_zero * incoming_zero,
                incoming_one,
                Some(*split),
            );
            recurse(
                tree,
                x,
                phi,
                cold,
                path,
                cold_zero * incoming_zero,
                0.0,
                Some(*split),
            );
        }
    }
}

fn extend(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = depth as f64;
    for i in (0..depth).rev() {
        let fi = i as f64;
        path[i + 1].pweight += one_fraction * path[i].pweight * (fi + 1.0) / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - fi) / (d + 1.0);
    }
}

fn unwind(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one);
            next_one_portion = tmp - path[i].pweight * zero * (d - fi) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero * (d - fi));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` unwound.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((fi + 1.0) * one);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero * ((d - fi) / (d + 1.0));
        } else if zero != 0.0 {
            total += (path[i].pweight / zero) / ((d - fi) / (d + 1.0));
        }
    }
    total
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

    /// Cover-weighted expectation of the tree given only the features in `known`.
    fn conditional_expectation(tree: &Tree, x: &[f64], known: &[bool], node: usize) -> f64 {
        match &tree.nodes[node] {
            Node::Leaf { value, .. } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                cover,
            } => {
                if known[*feature] {
                    let next = if x[*feature] <= *threshold { *left } else { *right };
                    conditional_expectation(tree, x, known, next)
                } else {
                    let l = tree.nodes[*left].cover() / cover;
                    let r = tree.nodes[*right].cover() / cover;
                    l * conditional_expectation(tree, x, known, *left)
                        + r * conditional_expectation(tree, x, known, *right)
                }
            }
        }
    }

    fn factorial(n: usize) -> f64 {
        (1..=n).map(|v| v as f64).product()
    }

    /// Shapley values by enumerating every coalition.
    fn brute_force(tree: &Tree, x: &[f64], m: usize) -> Vec<f64> {
        let mut phi = vec![0.0; m];
        for i in 0..m {
            for mask in 0..(1usize << m) {
                if mask & (1 << i) != 0 {
                    continue;
                }
                let size = mask.count_ones() as usize;
                let weight = factorial(size) * factorial(m - size - 1) / factorial(m);
                let without: Vec<bool> = (0..m).map(|j| mask & (1 << j) != 0).collect();
                let mut with = without.clone();
                with[i] = true;
                phi[i] += weight
                    * (conditional_expectation(tree, x, &with, 0)
                        - conditional_expectation(tree, x, &without, 0));
            }
        }
        phi
    }

    fn three_feature_tree() -> Tree {
        Tree {
            nodes: vec![
                split(0, 0.5, 1, 2, 100.0),
                split(1, 1.0, 3, 4, 60.0),
                split(2, -0.2, 5, 6, 40.0),
                leaf(0.3, 35.0),
                leaf(-0.7, 25.0),
                split(1, 2.0, 7, 8, 15.0),
                leaf(1.1, 25.0),
                leaf(-0.4, 5.0),
                leaf(0.9, 10.0),
            ],
        }
    }

    /// The same feature appears twice on one path.
    fn repeated_feature_tree() -> Tree {
        Tree {
            nodes: vec![
                split(0, 0.0, 1, 2, 80.0),
                split(1, 0.5, 3, 4, 50.0),
                leaf(0.6, 30.0),
                split(0, -1.0, 5, 6, 20.0),
                leaf(-0.2, 30.0),
                leaf(0.4, 8.0),
                leaf(-0.9, 12.0),
            ],
        }
    }

    #[test]
    fn matches_brute_force_shapley_values() {
        let tree = three_feature_tree();
        let inputs = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, -1.0],
            [0.2, 3.0, 0.5],
            [0.9, 1.5, -0.3],
        ];
        for x in inputs {
            let fast = tree_shap(&tree, &x, 3);
            let slow = brute_force(&tree, &x, 3);
            for (a, b) in fast.iter().zip(&slow) {
                assert!((a - b).abs() < 1e-10, "x={x:?}: treeshap={fast:?} brute={slow:?}");
            }
        }
    }

    #[test]
    fn handles_repeated_features_on_a_path() {
        let tree = repeated_feature_tree();
        for x in [[-2.0, 0.0], [-0.5, 0.2], [0.5, 1.0], [-0.5, 0.9]] {
            let fast = tree_shap(&tree, &x, 2);
            let slow = brute_force(&tree, &x, 2);
            for (a, b) in fast.iter().zip(&slow) {
                assert!((a - b).abs() < 1e-10, "x={x:?}: treeshap={fast:?} brute={slow:?}");
            }
        }
    }

    #[test]
    fn values_sum_to_prediction_minus_expectation() {
        let tree = three_feature_tree();
        let x = [0.9, 1.5, -0.3];
        let phi = tree_shap(&tree, &x, 3);
        let total: f64 = phi.iter().sum();
        assert!((tree.expected_value() + total - tree.predict(&x)).abs() < 1e-12);
    }

    #[test]
    fn unused_features_get_zero() {
        let tree = Tree {
            nodes: vec![split(1, 0.0, 1, 2, 4.0), leaf(1.0, 1.0), leaf(-1.0, 3.0)],
        };
        let phi = tree_shap(&tree, &[5.0, 1.0, 5.0], 3);
        assert_eq!(phi[0], 0.0);
        assert_eq!(phi[2], 0.0);
        // E = (1*1 + 3*-1)/4 = -0.5, f(x) = -1
        assert!((phi[1] - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn single_leaf_tree_has_no_attribution() {
        let tree = Tree {
            nodes: vec![leaf(0.25, 10.0)],
        };
        assert_eq!(tree_shap(&tree, &[1.0], 1), vec![0.0]);
    }
}
