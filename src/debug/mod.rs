//! Debug bundle writer for inspecting one scored record end to end.
//!
//! The bundle is a markdown file with the raw record, the encoded vector, the
//! leaf each tree routed the record to, and the per-feature contributions.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::Assessment;
use crate::artifacts::{ArtifactStore, ClassifierModel, Node};
use crate::error::AppError;

/// Write a bundle into `debug/` and return its path.
pub fn write_debug_bundle(assessment: &Assessment, store: &ArtifactStore) -> Result<PathBuf, AppError> {
    write_debug_bundle_in(Path::new("debug"), assessment, store)
}

pub fn write_debug_bundle_in(
    dir: &Path,
    assessment: &Assessment,
    store: &ArtifactStore,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S_%3f");
    let path = dir.join(format!("risk_debug_{ts}.md"));
    let mut file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;

    write_bundle(&mut file, assessment, store)
        .map_err(|e| AppError::new(4, format!("Failed to write debug bundle: {e}")))?;

    tracing::info!(path = %path.display(), "debug bundle written");
    Ok(path)
}

fn write_bundle(out: &mut impl Write, a: &Assessment, store: &ArtifactStore) -> std::io::Result<()> {
    writeln!(out, "# risk debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    if let Some(paths) = store.paths() {
        writeln!(out, "- transform: {}", paths.transform.display())?;
        writeln!(out, "- classifier: {}", paths.classifier.display())?;
    }
    writeln!(out, "- model: {}", store.classifier().model.display_name())?;

    writeln!(out, "\n## Record")?;
    writeln!(out, "| field | value |")?;
    writeln!(out, "| - | - |")?;
    let r = &a.record;
    for field in crate::domain::Field::ALL {
        let value = r
            .category(field)
            .map(|c| c.into_owned())
            .or_else(|| r.numeric(field).map(|v| v.to_string()))
            .unwrap_or_default();
        writeln!(out, "| {} | {} |", field.column_name(), value)?;
    }

    writeln!(out, "\n## Outcome")?;
    writeln!(out, "- label: {}", a.outcome.label.display_name())?;
    writeln!(out, "- probability: {:.6}", a.outcome.probability)?;
    writeln!(out, "- raw_score: {:.6}", a.outcome.raw_score)?;

    writeln!(out, "\n## Encoded vector")?;
    writeln!(out, "| # | column | value |")?;
    writeln!(out, "| - | - | - |")?;
    for (i, (column, value)) in a.encoded.columns.iter().zip(&a.encoded.values).enumerate() {
        writeln!(out, "| {i} | {} | {value:.6} |", column.name)?;
    }

    if let ClassifierModel::TreeEnsemble(ensemble) = &store.classifier().model {
        writeln!(out, "\n## Leaf trace (base_score {:.6})", ensemble.base_score)?;
        writeln!(out, "| tree | leaf | value | cover | expected |")?;
        writeln!(out, "| - | - | - | - | - |")?;
        for (t, tree) in ensemble.trees.iter().enumerate() {
            let leaf = tree.leaf_index(&a.encoded.values);
            if let Node::Leaf { value, cover } = &tree.nodes[leaf] {
                writeln!(
                    out,
                    "| {t} | {leaf} | {value:.6} | {cover:.1} | {:.6} |",
                    tree.expected_value()
                )?;
            }
        }
    }

    writeln!(out, "\n## Attribution")?;
    match &a.attribution {
        Ok(attr) => {
            writeln!(out, "- baseline: {:.6}", attr.baseline)?;
            writeln!(out, "- baseline + sum: {:.6}", attr.raw_output())?;
            writeln!(out, "| feature | value | contribution |")?;
            writeln!(out, "| - | - | - |")?;
            for c in attr.ranked() {
                writeln!(out, "| {} | {:.6} | {:+.6} |", c.feature, c.value, c.contribution)?;
            }
        }
        Err(err) => writeln!(out, "- unavailable: {err}")?,
    }
    Ok(())
}
