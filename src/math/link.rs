//! Logistic link between log-odds and probabilities.
//!
//! Boosted binary classifiers score in log-odds; the pipeline reports the
//! positive-class probability. The link is written to avoid overflow for
//! large-magnitude inputs.

/// Numerically stable logistic sigmoid.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
