use std::path::{Path, PathBuf};

use crate::error::SubmitError;
use crate::sanitize;

/// An upload that passed validation and may become a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub filename: String,
    /// Lower-cased extension, one of the accepted set.
    pub extension: String,
}

impl Submission {
    /// Checks the client-supplied file name against the accepted extensions
    /// (case-insensitive). Nothing is created on failure.
    pub fn validate(filename: &str, accepted: &[String]) -> Result<Self, SubmitError> {
        if !sanitize::is_safe_filename(filename) {
            return Err(SubmitError::InvalidFilename(filename.to_string()));
        }

        let extension = sanitize::extension_of(filename)
            .filter(|ext| accepted.iter().any(|a| a.eq_ignore_ascii_case(ext)))
            .ok_or_else(|| SubmitError::UnsupportedFormat {
                filename: filename.to_string(),
                accepted: accepted.join(", "),
            })?;

        Ok(Self {
            filename: filename.to_string(),
            extension,
        })
    }

    /// `<upload_dir>/<job_id>_<filename>`
    pub fn upload_path(&self, upload_directory: &Path, job_id: &str) -> PathBuf {
        upload_directory.join(format!("{}_{}", job_id, self.filename))
    }
}
