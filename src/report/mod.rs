//! Reporting utilities: formatted terminal output.
//!
//! Formatting lives in one place so the pipeline and attribution code stay
//! free of presentation concerns, and the TUI can reuse the same text.

pub mod format;

pub use format::*;
