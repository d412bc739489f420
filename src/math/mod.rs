//! Mathematical utilities.

pub mod link;

pub use link::*;
