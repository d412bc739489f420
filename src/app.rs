//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - loads the fitted artifacts
//! - scores records and prints reports, or hands over to the TUI

use clap::Parser;

use crate::artifacts::ArtifactStore;
use crate::cli::{ArtifactArgs, Command, PredictArgs};
use crate::error::AppError;
use crate::logging::LogTarget;

pub mod pipeline;

/// Entry point for the `risk` binary.
pub fn run() -> Result<(), AppError> {
    // `risk` and `risk --artifacts dir` behave like `risk tui ...`.
    //
    // Clap requires a subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Predict(args) => handle_predict(args),
        Command::Inspect(args) => handle_inspect(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn load_store(args: &ArtifactArgs) -> Result<ArtifactStore, AppError> {
    let paths = args.paths();
    Ok(ArtifactStore::load(&paths)?)
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    crate::logging::init(LogTarget::Stderr)?;
    let store = load_store(&args.artifacts)?;
    let record = args.record.to_record()?;

    let assessment = pipeline::assess(&record, &store)?;
    println!("{}", crate::report::format_assessment(&assessment, args.top));

    if !args.no_plot {
        if let Ok(attribution) = &assessment.attribution {
            let rows = attribution.top_k(args.top);
            println!("{}", crate::plot::render_contribution_bars(&rows, args.width));
        }
    }

    if let Some(path) = &args.export {
        crate::io::write_assessment_json(path, &assessment)?;
    }
    Ok(())
}

fn handle_inspect(args: ArtifactArgs) -> Result<(), AppError> {
    crate::logging::init(LogTarget::Stderr)?;
    let store = load_store(&args)?;
    println!("{}", crate::report::format_store_summary(&store));
    Ok(())
}

fn handle_tui(args: ArtifactArgs) -> Result<(), AppError> {
    crate::logging::init(LogTarget::TuiFile)?;
    let store = load_store(&args)?;
    crate::tui::run(store)
}

/// Rewrite argv so `risk` defaults to `risk tui`.
///
/// Rules:
/// - `risk`                        -> `risk tui`
/// - `risk --artifacts dir ...`    -> `risk tui --artifacts dir ...`
/// - `risk --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "predict" | "inspect" | "tui");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(args(&["risk"])), args(&["risk", "tui"]));
        assert_eq!(
            rewrite_args(args(&["risk", "--artifacts", "m"])),
            args(&["risk", "tui", "--artifacts", "m"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for argv in [
            args(&["risk", "predict", "--age", "40"]),
            args(&["risk", "inspect"]),
            args(&["risk", "--help"]),
            args(&["risk", "-V"]),
        ] {
            assert_eq!(rewrite_args(argv.clone()), argv);
        }
    }
}
