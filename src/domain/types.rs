//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built from form/CLI input
//! - passed through the scoring pipeline
//! - exported to JSON for later inspection

use std::borrow::Cow;
use std::collections::HashMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Inclusive age bounds accepted by the form.
pub const AGE_RANGE: (u32, u32) = (18, 75);
/// Inclusive credit amount bounds (DM).
pub const CREDIT_AMOUNT_RANGE: (f64, f64) = (100.0, 20_000.0);
/// Inclusive loan duration bounds (months).
pub const DURATION_RANGE: (u32, u32) = (4, 72);

/// A closed set of choices that the form can cycle through.
pub trait Choice: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    /// Human-readable label for terminal output.
    fn display_name(self) -> &'static str;

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Job category, ordinal from unskilled to highly skilled.
///
/// Serialized as its integer code because the transform was fitted on codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobLevel {
    UnskilledNonResident,
    UnskilledResident,
    Skilled,
    HighlySkilled,
}

impl JobLevel {
    pub fn code(self) -> u8 {
        match self {
            JobLevel::UnskilledNonResident => 0,
            JobLevel::UnskilledResident => 1,
            JobLevel::Skilled => 2,
            JobLevel::HighlySkilled => 3,
        }
    }
}

impl TryFrom<u8> for JobLevel {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(JobLevel::UnskilledNonResident),
            1 => Ok(JobLevel::UnskilledResident),
            2 => Ok(JobLevel::Skilled),
            3 => Ok(JobLevel::HighlySkilled),
            other => Err(ValidationError::OutOfRange {
                field: Field::Job,
                value: other.to_string(),
                min: "0".to_string(),
                max: "3".to_string(),
            }),
        }
    }
}

impl From<JobLevel> for u8 {
    fn from(job: JobLevel) -> Self {
        job.code()
    }
}

impl Choice for JobLevel {
    const ALL: &'static [Self] = &[
        JobLevel::UnskilledNonResident,
        JobLevel::UnskilledResident,
        JobLevel::Skilled,
        JobLevel::HighlySkilled,
    ];

    fn display_name(self) -> &'static str {
        match self {
            JobLevel::UnskilledNonResident => "0 - unskilled, non-resident",
            JobLevel::UnskilledResident => "1 - unskilled, resident",
            JobLevel::Skilled => "2 - skilled",
            JobLevel::HighlySkilled => "3 - highly skilled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Choice for Sex {
    const ALL: &'static [Self] = &[Sex::Male, Sex::Female];

    fn display_name(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Housing {
    Own,
    Free,
    Rent,
}

impl Choice for Housing {
    const ALL: &'static [Self] = &[Housing::Own, Housing::Free, Housing::Rent];

    fn display_name(self) -> &'static str {
        match self {
            Housing::Own => "own",
            Housing::Free => "free",
            Housing::Rent => "rent",
        }
    }
}

/// Saving account balance level. `NoInfo` marks missing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SavingAccounts {
    #[serde(rename = "little")]
    Little,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "rich")]
    Rich,
    #[serde(rename = "quite rich")]
    #[value(name = "quite-rich")]
    QuiteRich,
    #[serde(rename = "no_info")]
    #[value(name = "no-info", alias = "no_info")]
    NoInfo,
}

impl Choice for SavingAccounts {
    const ALL: &'static [Self] = &[
        SavingAccounts::Little,
        SavingAccounts::Moderate,
        SavingAccounts::Rich,
        SavingAccounts::QuiteRich,
        SavingAccounts::NoInfo,
    ];

    fn display_name(self) -> &'static str {
        match self {
            SavingAccounts::Little => "little",
            SavingAccounts::Moderate => "moderate",
            SavingAccounts::Rich => "rich",
            SavingAccounts::QuiteRich => "quite rich",
            SavingAccounts::NoInfo => "no_info",
        }
    }
}

/// Checking account balance level. `NoInfo` marks missing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum CheckingAccount {
    #[serde(rename = "little")]
    Little,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "rich")]
    Rich,
    #[serde(rename = "no_info")]
    #[value(name = "no-info", alias = "no_info")]
    NoInfo,
}

impl Choice for CheckingAccount {
    const ALL: &'static [Self] = &[
        CheckingAccount::Little,
        CheckingAccount::Moderate,
        CheckingAccount::Rich,
        CheckingAccount::NoInfo,
    ];

    fn display_name(self) -> &'static str {
        match self {
            CheckingAccount::Little => "little",
            CheckingAccount::Moderate => "moderate",
            CheckingAccount::Rich => "rich",
            CheckingAccount::NoInfo => "no_info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Purpose {
    #[serde(rename = "radio/TV")]
    #[value(name = "radio-tv")]
    RadioTv,
    #[serde(rename = "education")]
    Education,
    #[serde(rename = "car")]
    Car,
    #[serde(rename = "furniture/equipment")]
    #[value(name = "furniture-equipment")]
    FurnitureEquipment,
    #[serde(rename = "business")]
    Business,
    #[serde(rename = "repairs")]
    Repairs,
    #[serde(rename = "domestic appliances")]
    #[value(name = "domestic-appliances")]
    DomesticAppliances,
    #[serde(rename = "vacation/others")]
    #[value(name = "vacation-others")]
    VacationOthers,
}

impl Choice for Purpose {
    const ALL: &'static [Self] = &[
        Purpose::RadioTv,
        Purpose::Education,
        Purpose::Car,
        Purpose::FurnitureEquipment,
        Purpose::Business,
        Purpose::Repairs,
        Purpose::DomesticAppliances,
        Purpose::VacationOthers,
    ];

    fn display_name(self) -> &'static str {
        match self {
            Purpose::RadioTv => "radio/TV",
            Purpose::Education => "education",
            Purpose::Car => "car",
            Purpose::FurnitureEquipment => "furniture/equipment",
            Purpose::Business => "business",
            Purpose::Repairs => "repairs",
            Purpose::DomesticAppliances => "domestic appliances",
            Purpose::VacationOthers => "vacation/others",
        }
    }
}

/// The raw applicant columns, named as they were during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Age")]
    Age,
    #[serde(rename = "Job")]
    Job,
    #[serde(rename = "Sex")]
    Sex,
    #[serde(rename = "Housing")]
    Housing,
    #[serde(rename = "Saving accounts")]
    SavingAccounts,
    #[serde(rename = "Checking account")]
    CheckingAccount,
    #[serde(rename = "Credit amount")]
    CreditAmount,
    #[serde(rename = "Duration")]
    Duration,
    #[serde(rename = "Purpose")]
    Purpose,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Age,
        Field::Job,
        Field::Sex,
        Field::Housing,
        Field::SavingAccounts,
        Field::CheckingAccount,
        Field::CreditAmount,
        Field::Duration,
        Field::Purpose,
    ];

    /// Column name used by the fitted transform.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Age => "Age",
            Field::Job => "Job",
            Field::Sex => "Sex",
            Field::Housing => "Housing",
            Field::SavingAccounts => "Saving accounts",
            Field::CheckingAccount => "Checking account",
            Field::CreditAmount => "Credit amount",
            Field::Duration => "Duration",
            Field::Purpose => "Purpose",
        }
    }

    /// Whether a numeric encoder (scaling, passthrough) may read this field.
    pub fn accepts_numeric(self) -> bool {
        matches!(
            self,
            Field::Age | Field::Job | Field::CreditAmount | Field::Duration
        )
    }

    /// Whether a categorical encoder may read this field.
    ///
    /// `Job` is ordinal and may be encoded either way.
    pub fn accepts_categorical(self) -> bool {
        !matches!(self, Field::Age | Field::CreditAmount | Field::Duration)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One applicant's attributes, as entered in the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub age: u32,
    pub job: JobLevel,
    pub sex: Sex,
    pub housing: Housing,
    pub saving_accounts: SavingAccounts,
    pub checking_account: CheckingAccount,
    /// Requested credit amount (DM).
    pub credit_amount: f64,
    /// Loan duration in months.
    pub duration: u32,
    pub purpose: Purpose,
}

impl Default for ApplicantRecord {
    fn default() -> Self {
        Self {
            age: 30,
            job: JobLevel::Skilled,
            sex: Sex::Male,
            housing: Housing::Own,
            saving_accounts: SavingAccounts::Little,
            checking_account: CheckingAccount::Little,
            credit_amount: 5000.0,
            duration: 24,
            purpose: Purpose::RadioTv,
        }
    }
}

impl ApplicantRecord {
    /// Check every bounded field against its declared domain.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range(Field::Age, self.age, AGE_RANGE)?;
        check_range(Field::Duration, self.duration, DURATION_RANGE)?;

        let (lo, hi) = CREDIT_AMOUNT_RANGE;
        if !(self.credit_amount.is_finite() && (lo..=hi).contains(&self.credit_amount)) {
            return Err(ValidationError::OutOfRange {
                field: Field::CreditAmount,
                value: self.credit_amount.to_string(),
                min: lo.to_string(),
                max: hi.to_string(),
            });
        }
        Ok(())
    }

    /// Consume the record, returning it only if it is within its domains.
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.validate()?;
        Ok(self)
    }

    /// Numeric value of a field, if the field is numeric or ordinal.
    pub fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::Age => Some(f64::from(self.age)),
            Field::Job => Some(f64::from(self.job.code())),
            Field::CreditAmount => Some(self.credit_amount),
            Field::Duration => Some(f64::from(self.duration)),
            _ => None,
        }
    }

    /// Category string of a field, exactly as the transform was fitted on it.
    pub fn category(&self, field: Field) -> Option<Cow<'static, str>> {
        match field {
            Field::Job => Some(Cow::Owned(self.job.code().to_string())),
            Field::Sex => Some(Cow::Borrowed(self.sex.display_name())),
            Field::Housing => Some(Cow::Borrowed(self.housing.display_name())),
            Field::SavingAccounts => Some(Cow::Borrowed(self.saving_accounts.display_name())),
            Field::CheckingAccount => Some(Cow::Borrowed(self.checking_account.display_name())),
            Field::Purpose => Some(Cow::Borrowed(self.purpose.display_name())),
            Field::Age | Field::CreditAmount | Field::Duration => None,
        }
    }
}

fn check_range(field: Field, value: u32, (min, max): (u32, u32)) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        field,
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    })
}

/// Binary credit-risk decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Good,
    Bad,
}

impl RiskLabel {
    pub fn display_name(self) -> &'static str {
        match self {
            RiskLabel::Good => "Good",
            RiskLabel::Bad => "Bad",
        }
    }
}

/// Output of the inference pipeline for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub label: RiskLabel,
    /// Probability of the positive ("bad credit") class.
    pub probability: f64,
    /// Pre-link model output (log-odds).
    pub raw_score: f64,
}

/// Contribution of one encoded feature to one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    /// Encoded column name, e.g. `Checking account_no_info`.
    pub feature: String,
    /// Raw applicant field the column was derived from.
    pub field: Field,
    /// Encoded feature value fed to the classifier.
    pub value: f64,
    /// Signed contribution in log-odds; positive pushes toward `Bad`.
    pub contribution: f64,
}

/// Additive explanation of one prediction relative to the model's expected output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub baseline: f64,
    /// One entry per encoded column, in transform column order.
    pub contributions: Vec<FeatureContribution>,
}

impl AttributionResult {
    /// Baseline plus every contribution; approximates the raw model output.
    pub fn raw_output(&self) -> f64 {
        self.baseline + self.contributions.iter().map(|c| c.contribution).sum::<f64>()
    }

    /// Contributions ordered by descending magnitude (ties keep column order).
    pub fn ranked(&self) -> Vec<&FeatureContribution> {
        let mut out: Vec<&FeatureContribution> = self.contributions.iter().collect();
        out.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }

    pub fn top_k(&self, k: usize) -> Vec<&FeatureContribution> {
        let mut ranked = self.ranked();
        ranked.truncate(k);
        ranked
    }

    /// Contributions summed per raw applicant field, by descending magnitude.
    ///
    /// One-hot columns fold back into their source field, which keeps the
    /// additive property intact.
    pub fn by_field(&self) -> Vec<(Field, f64)> {
        let mut totals: HashMap<Field, f64> = HashMap::new();
        for c in &self.contributions {
            *totals.entry(c.field).or_insert(0.0) += c.contribution;
        }
        let mut out: Vec<(Field, f64)> = totals.into_iter().collect();
        out.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        out
    }
}
