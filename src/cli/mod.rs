//! Command-line parsing for the credit-risk scorer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! artifact/pipeline code. Conversion into domain types happens here too, so
//! `app` only sees an `ApplicantRecord` and resolved artifact paths.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::artifacts::ArtifactPaths;
use crate::domain::{
    ApplicantRecord, CheckingAccount, Housing, JobLevel, Purpose, SavingAccounts, Sex,
};
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "risk",
    version,
    about = "Credit risk scoring with per-feature explanations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score one applicant, print the decision and its top drivers.
    Predict(PredictArgs),
    /// Print a summary of the loaded artifacts.
    Inspect(ArtifactArgs),
    /// Launch the interactive form (default when no subcommand is given).
    Tui(ArtifactArgs),
}

/// Where to find the fitted artifacts.
#[derive(Debug, Args, Clone, Default)]
pub struct ArtifactArgs {
    /// Directory holding `preprocessor.json` and `classifier.json`.
    #[arg(long = "artifacts", value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Transform artifact (overrides the directory).
    #[arg(long, value_name = "JSON")]
    pub transform: Option<PathBuf>,

    /// Classifier artifact (overrides the directory).
    #[arg(long, value_name = "JSON")]
    pub classifier: Option<PathBuf>,
}

impl ArtifactArgs {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::resolve(
            self.artifact_dir.as_deref(),
            self.transform.as_deref(),
            self.classifier.as_deref(),
        )
    }
}

/// Applicant attributes. Defaults match the form's initial state.
#[derive(Debug, Args, Clone)]
pub struct RecordArgs {
    /// Applicant age in years (18-75).
    #[arg(long, default_value_t = 30)]
    pub age: u32,

    /// Job level: 0 unskilled non-resident, 1 unskilled resident, 2 skilled, 3 highly skilled.
    #[arg(long, default_value_t = 2)]
    pub job: u8,

    #[arg(long, value_enum, default_value_t = Sex::Male)]
    pub sex: Sex,

    #[arg(long, value_enum, default_value_t = Housing::Own)]
    pub housing: Housing,

    #[arg(long, value_enum, default_value_t = SavingAccounts::Little)]
    pub saving_accounts: SavingAccounts,

    #[arg(long, value_enum, default_value_t = CheckingAccount::Little)]
    pub checking_account: CheckingAccount,

    /// Requested credit amount (100-20000).
    #[arg(long, default_value_t = 5000.0)]
    pub credit_amount: f64,

    /// Loan duration in months (4-72).
    #[arg(long, default_value_t = 24)]
    pub duration: u32,

    #[arg(long, value_enum, default_value_t = Purpose::RadioTv)]
    pub purpose: Purpose,

    /// Read the whole record from a JSON file instead of flags.
    #[arg(long, value_name = "JSON")]
    pub input: Option<PathBuf>,
}

impl RecordArgs {
    /// Build the record from `--input` or the individual flags.
    pub fn to_record(&self) -> Result<ApplicantRecord, AppError> {
        if let Some(path) = &self.input {
            return crate::io::read_record_json(path);
        }
        let job = JobLevel::try_from(self.job)?;
        Ok(ApplicantRecord {
            age: self.age,
            job,
            sex: self.sex,
            housing: self.housing,
            saving_accounts: self.saving_accounts,
            checking_account: self.checking_account,
            credit_amount: self.credit_amount,
            duration: self.duration,
            purpose: self.purpose,
        })
    }
}

/// Options for `risk predict`.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    #[command(flatten)]
    pub record: RecordArgs,

    /// Show the top-N contributing features.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Disable the contribution bar chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Bar chart width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Export record, outcome and attribution to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}
