//! `credit-risk` library crate.
//!
//! The binary (`risk`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - artifacts, pipeline and attribution are reusable from other front-ends
//! - presentation (CLI text, TUI) stays separate from scoring

pub mod app;
pub mod artifacts;
pub mod cli;
pub mod debug;
pub mod domain;
pub mod error;
pub mod explain;
pub mod io;
pub mod logging;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
