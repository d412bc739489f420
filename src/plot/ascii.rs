//! ASCII/Unicode contribution chart for terminal output.
//!
//! Diverging horizontal bars around a zero axis, one row per feature:
//! - positive contribution (toward bad): `#` to the right of `|`
//! - negative contribution (toward good): `=` to the left of `|`
//!
//! Output is deterministic for a given input (helpful for golden tests).

use crate::domain::FeatureContribution;

const LABEL_WIDTH: usize = 28;

/// Render `rows` (already ranked) as a diverging bar chart `width` columns wide.
pub fn render_contribution_bars(rows: &[&FeatureContribution], width: usize) -> String {
    let bar_area = width.saturating_sub(LABEL_WIDTH + 12).max(10);
    let half = bar_area / 2;

    let max_abs = rows
        .iter()
        .map(|c| c.contribution.abs())
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    out.push_str(&format!(
        "Contributions (log-odds): {:<width$}|{:>width$}\n",
        "<- good",
        "bad ->",
        width = half
    ));

    for c in rows {
        let len = scaled_len(c.contribution, max_abs, half);
        let (left, right) = if c.contribution < 0.0 {
            (format!("{:>half$}", "=".repeat(len)), String::new())
        } else {
            (" ".repeat(half), "#".repeat(len))
        };
        let line = format!(
            "{:<label$} {left}|{right:<half$} {:>+9.4}",
            clip(&c.feature, LABEL_WIDTH),
            c.contribution,
            label = LABEL_WIDTH
        );
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn scaled_len(v: f64, max_abs: f64, half: usize) -> usize {
    if !(v.is_finite() && max_abs > 0.0) {
        return 0;
    }
    let len = (v.abs() / max_abs * half as f64).round() as usize;
    // Keep tiny non-zero values visible.
    if v != 0.0 { len.clamp(1, half) } else { 0 }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Field;

    fn contribution(feature: &str, contribution: f64) -> FeatureContribution {
        FeatureContribution {
            feature: feature.to_string(),
            field: Field::Age,
            value: 0.0,
            contribution,
        }
    }

    #[test]
    fn bars_point_the_right_way() {
        let up = contribution("Duration", 0.4);
        let down = contribution("Checking account_no_info", -0.2);
        let chart = render_contribution_bars(&[&up, &down], 80);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 3);

        let (left, right) = lines[1].split_once('|').unwrap();
        assert!(right.contains('#'));
        assert!(!left.contains('='));

        let (left, right) = lines[2].split_once('|').unwrap();
        assert!(left.contains('='));
        assert!(!right.contains('#'));
    }

    #[test]
    fn largest_bar_fills_half_the_area() {
        let a = contribution("a", 1.0);
        let b = contribution("b", 0.5);
        let chart = render_contribution_bars(&[&a, &b], 60);
        let count = |line: &str| line.chars().filter(|c| *c == '#').count();
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(count(lines[1]), 2 * count(lines[2]));
    }

    #[test]
    fn zero_and_empty_inputs_render() {
        let z = contribution("z", 0.0);
        let chart = render_contribution_bars(&[&z], 40);
        assert!(!chart.contains('#'));
        assert_eq!(render_contribution_bars(&[], 40).lines().count(), 1);
    }
}
