//! Input/output helpers.
//!
//! - applicant record JSON input (`record`)
//! - assessment JSON export (`export`)

pub mod export;
pub mod record;

pub use export::*;
pub use record::*;
