//! Read an applicant record from JSON.
//!
//! Keys are the `ApplicantRecord` field names; categories use the same strings
//! as the fitted transform, e.g. `"saving_accounts": "quite rich"`.

use std::fs::File;
use std::path::Path;

use crate::domain::ApplicantRecord;
use crate::error::AppError;

pub fn read_record_json(path: &Path) -> Result<ApplicantRecord, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(3, format!("Failed to open record JSON '{}': {e}", path.display())))?;
    let record: ApplicantRecord = serde_json::from_reader(file)
        .map_err(|e| AppError::new(3, format!("Invalid record JSON '{}': {e}", path.display())))?;
    Ok(record.validated()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobLevel, Purpose, SavingAccounts};

    #[test]
    fn reads_training_category_strings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("r.json");
        std::fs::write(
            &path,
            r#"{"age": 41, "job": 3, "sex": "female", "housing": "rent",
                "saving_accounts": "quite rich", "checking_account": "no_info",
                "credit_amount": 1200.5, "duration": 6, "purpose": "radio/TV"}"#,
        )
        .unwrap();
        let r = read_record_json(&path).unwrap();
        assert_eq!(r.job, JobLevel::HighlySkilled);
        assert_eq!(r.saving_accounts, SavingAccounts::QuiteRich);
        assert_eq!(r.purpose, Purpose::RadioTv);
    }

    #[test]
    fn rejects_bad_codes_and_ranges() {
        let tmp = tempfile::tempdir().unwrap();
        let bad_job = tmp.path().join("job.json");
        std::fs::write(
            &bad_job,
            r#"{"age": 41, "job": 9, "sex": "female", "housing": "rent",
                "saving_accounts": "little", "checking_account": "little",
                "credit_amount": 1200, "duration": 6, "purpose": "car"}"#,
        )
        .unwrap();
        assert_eq!(read_record_json(&bad_job).unwrap_err().exit_code(), 3);

        let too_young = tmp.path().join("age.json");
        std::fs::write(
            &too_young,
            r#"{"age": 12, "job": 1, "sex": "male", "housing": "own",
                "saving_accounts": "little", "checking_account": "little",
                "credit_amount": 1200, "duration": 6, "purpose": "car"}"#,
        )
        .unwrap();
        let err = read_record_json(&too_young).unwrap_err();
        assert!(err.to_string().contains("Age"));
    }
}
