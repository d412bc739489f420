//! Plain-text report formatting for predictions and their explanations.

use crate::app::pipeline::{Assessment, DECISION_THRESHOLD};
use crate::artifacts::{ArtifactStore, ClassifierModel, ColumnEncoder};
use crate::domain::{AttributionResult, FeatureContribution, PredictionOutcome, RiskLabel};

/// One bar of a waterfall: what it adds and where the running total ends up.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallStep {
    pub label: String,
    pub delta: f64,
    pub cumulative: f64,
}

/// Baseline → top-N contributions → remainder, ending at the model output.
///
/// The first step is the baseline (delta equals the baseline) and the last
/// cumulative value always equals `raw_output()`.
pub fn waterfall_steps(attribution: &AttributionResult, top_n: usize) -> Vec<WaterfallStep> {
    let mut steps = Vec::with_capacity(top_n + 2);
    let mut running = attribution.baseline;
    steps.push(WaterfallStep {
        label: "baseline".to_string(),
        delta: attribution.baseline,
        cumulative: running,
    });

    let top = attribution.top_k(top_n);
    for c in &top {
        running += c.contribution;
        steps.push(WaterfallStep {
            label: c.feature.clone(),
            delta: c.contribution,
            cumulative: running,
        });
    }

    let rest = attribution.contributions.len() - top.len();
    if rest > 0 {
        // Recompute from the total so the last bar lands exactly on the output.
        let total = attribution.raw_output();
        steps.push(WaterfallStep {
            label: format!("{rest} other features"),
            delta: total - running,
            cumulative: total,
        });
    }
    steps
}

/// Headline decision.
pub fn format_prediction(outcome: &PredictionOutcome) -> String {
    let headline = match outcome.label {
        RiskLabel::Bad => "Prediction: Bad credit risk",
        RiskLabel::Good => "Prediction: Good credit risk",
    };
    format!(
        "{headline}\nProbability of bad credit: {:.1}% (threshold {:.0}%)\nRaw score (log-odds): {:+.4}\n",
        outcome.probability * 100.0,
        DECISION_THRESHOLD * 100.0,
        outcome.raw_score
    )
}

/// Top-N drivers by magnitude.
pub fn format_drivers(attribution: &AttributionResult, top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("Top {top_n} risk drivers (log-odds):\n"));
    out.push_str(
        format!(
            "{:<4} {:<36} {:>10} {:>12} {:<10}\n",
            "#", "feature", "value", "contrib", "direction"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<36} {:-<10} {:-<12} {:-<10}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for (i, c) in attribution.top_k(top_n).iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<36} {:>10.3} {:>+12.4} {:<10}\n",
            i + 1,
            truncate(&c.feature, 36),
            c.value,
            c.contribution,
            direction(c)
        ));
    }
    out
}

pub fn format_waterfall(attribution: &AttributionResult, top_n: usize) -> String {
    let mut out = String::from("Waterfall (log-odds):\n");
    let steps = waterfall_steps(attribution, top_n);
    for (i, step) in steps.iter().enumerate() {
        let delta = if i == 0 {
            " ".repeat(10)
        } else {
            format!("{:>+10.4}", step.delta)
        };
        out.push_str(&format!(
            "  {:<36} {delta} -> {:>+9.4}\n",
            truncate(&step.label, 36),
            step.cumulative
        ));
    }
    out.push_str(&format!("  {:<36} {:>10} == {:>+9.4}\n", "model output", "", attribution.raw_output()));
    out
}

/// Contributions folded back to the nine raw applicant fields.
pub fn format_field_totals(attribution: &AttributionResult) -> String {
    let mut out = String::from("By applicant field:\n");
    for (field, total) in attribution.by_field() {
        out.push_str(&format!("  {:<20} {:>+10.4}\n", field.column_name(), total));
    }
    out
}

/// Force view: total push toward bad vs toward good, with the biggest names.
pub fn format_force(attribution: &AttributionResult, names_per_side: usize) -> String {
    let ranked = attribution.ranked();
    let (bad, good): (Vec<&FeatureContribution>, Vec<&FeatureContribution>) =
        ranked.into_iter().filter(|c| c.contribution != 0.0).partition(|c| c.contribution > 0.0);

    let side = |items: &[&FeatureContribution]| -> (f64, String) {
        let total = items.iter().map(|c| c.contribution).sum::<f64>();
        let names: Vec<&str> = items
            .iter()
            .take(names_per_side)
            .map(|c| c.feature.as_str())
            .collect();
        (total, names.join(", "))
    };
    let (bad_total, bad_names) = side(bad.as_slice());
    let (good_total, good_names) = side(good.as_slice());

    format!(
        "base {:+.3} | toward bad {:+.3} [{bad_names}] | toward good {:+.3} [{good_names}] | output {:+.3}\n",
        attribution.baseline,
        bad_total,
        good_total,
        attribution.raw_output()
    )
}

/// Full `risk predict` report for one assessment.
pub fn format_assessment(assessment: &Assessment, top_n: usize) -> String {
    let mut out = format_prediction(&assessment.outcome);
    out.push('\n');
    match &assessment.attribution {
        Ok(attribution) => {
            out.push_str(&format_drivers(attribution, top_n));
            out.push('\n');
            out.push_str(&format_waterfall(attribution, top_n));
            out.push('\n');
            out.push_str(&format_field_totals(attribution));
        }
        Err(err) => {
            out.push_str(&format!("Explanation unavailable: {err}\n"));
        }
    }
    out
}

/// Summary printed by `risk inspect`.
pub fn format_store_summary(store: &ArtifactStore) -> String {
    let mut out = String::new();
    out.push_str("=== risk - artifact summary ===\n");
    if let Some(paths) = store.paths() {
        out.push_str(&format!("Transform : {}\n", paths.transform.display()));
        out.push_str(&format!("Classifier: {}\n", paths.classifier.display()));
    }

    let transform = store.transform();
    out.push_str(&format!(
        "\nTransform: {} encoders -> {} columns\n",
        transform.columns.len(),
        transform.width()
    ));
    for encoder in &transform.columns {
        let detail = match encoder {
            ColumnEncoder::Standard { mean, scale, .. } => format!("standard (mean={mean:.3}, scale={scale:.3})"),
            ColumnEncoder::Passthrough { .. } => "passthrough".to_string(),
            ColumnEncoder::OneHot {
                categories,
                handle_unknown,
                ..
            } => format!(
                "one-hot {} categories, unknown={handle_unknown:?}",
                categories.len()
            ),
        };
        out.push_str(&format!("  {:<20} {detail}\n", encoder.field().column_name()));
    }

    let classifier = store.classifier();
    out.push_str(&format!(
        "\nClassifier: {} over {} features\n",
        classifier.model.display_name(),
        classifier.n_features()
    ));
    match &classifier.model {
        ClassifierModel::TreeEnsemble(ensemble) => {
            let max_depth = ensemble.trees.iter().map(|t| t.depth()).max().unwrap_or(0);
            let leaves: usize = ensemble.trees.iter().map(|t| t.leaf_count()).sum();
            out.push_str(&format!(
                "  trees={} max_depth={max_depth} leaves={leaves}\n",
                ensemble.trees.len()
            ));
            out.push_str(&format!(
                "  base_score={:+.4} expected_output={:+.4}\n",
                ensemble.base_score,
                ensemble.expected_value()
            ));
        }
        ClassifierModel::Logistic(model) => {
            out.push_str(&format!("  intercept={:+.4}\n", model.intercept));
            out.push_str("  (attribution unavailable for this model)\n");
        }
    }
    out
}

fn direction(c: &FeatureContribution) -> &'static str {
    if c.contribution > 0.0 {
        "-> bad"
    } else if c.contribution < 0.0 {
        "-> good"
    } else {
        ""
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
