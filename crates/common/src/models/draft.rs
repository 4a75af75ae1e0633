//! Submission types: the editable draft, its fan-out batch, and the outcome

use super::{Branch, PaperType, Record, Status};
use crate::config::ValidationConfig;
use crate::errors::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use validator::Validate;

fn paper_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Z]{2,5})-(\d{4})$").expect("paper code pattern compiles"))
}

/// `{prefix}-{4-digit-code}`, e.g. `BCS-3011`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaperCode {
    pub prefix: String,
    pub number: String,
}

impl PaperCode {
    /// Parse and check the prefix against the allowed set (case-insensitive input)
    pub fn parse(value: &str, allowed_prefixes: &[String]) -> Result<Self> {
        let normalized = value.trim().to_uppercase();
        let invalid = || AppError::InvalidPaperCode {
            code: value.trim().to_string(),
        };

        let captures = paper_code_pattern().captures(&normalized).ok_or_else(invalid)?;
        let prefix = captures[1].to_string();
        if !allowed_prefixes.iter().any(|p| p.eq_ignore_ascii_case(&prefix)) {
            return Err(invalid());
        }

        Ok(Self {
            prefix,
            number: captures[2].to_string(),
        })
    }
}

impl fmt::Display for PaperCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.number)
    }
}

/// Metadata of the PDF picked for upload. The upload itself is handled elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfUpload {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl PdfUpload {
    pub fn validate(&self, max_bytes: u64) -> Result<()> {
        let is_pdf = self.content_type.eq_ignore_ascii_case("application/pdf")
            && self.file_name.to_lowercase().ends_with(".pdf");
        if !is_pdf {
            return Err(AppError::InvalidUpload {
                message: format!("{} is not a PDF", self.file_name),
            });
        }
        if self.size_bytes == 0 {
            return Err(AppError::InvalidUpload {
                message: format!("{} is empty", self.file_name),
            });
        }
        if self.size_bytes > max_bytes {
            return Err(AppError::InvalidUpload {
                message: format!(
                    "{} is {} bytes, limit is {} bytes",
                    self.file_name, self.size_bytes, max_bytes
                ),
            });
        }
        Ok(())
    }
}

/// The user-editable part of a submission, shared by every branch it fans out to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    #[validate(length(min = 1, max = 2))]
    pub year: String,

    #[validate(length(min = 1, max = 2))]
    pub semester: String,

    #[validate(length(min = 1, max = 16))]
    pub paper_code: String,

    #[validate(length(min = 1, max = 200))]
    pub subject_name: String,

    pub paper_type: Option<PaperType>,

    #[validate(email)]
    pub email: String,

    #[validate(url)]
    pub pdf_url: Option<String>,
}

impl RecordDraft {
    /// Full client-side validation; nothing reaches the gateway unless this passes
    pub fn check(&self, rules: &ValidationConfig) -> Result<PaperCode> {
        self.validate()?;

        let year: u32 = self.year.trim().parse().unwrap_or(0);
        if !(1..=4).contains(&year) {
            return Err(AppError::Validation {
                message: format!("year must be 1-4, got '{}'", self.year.trim()),
                field: Some("year".into()),
            });
        }

        let semester: u32 = self.semester.trim().parse().unwrap_or(0);
        if !(1..=8).contains(&semester) {
            return Err(AppError::Validation {
                message: format!("semester must be 1-8, got '{}'", self.semester.trim()),
                field: Some("semester".into()),
            });
        }

        PaperCode::parse(&self.paper_code, &rules.paper_code_prefixes)
    }

    pub fn type_label(&self) -> &'static str {
        self.paper_type.map(|t| t.as_str()).unwrap_or("")
    }
}

/// One logical submission producing one record per branch, all sharing `batch_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionBatch {
    pub batch_id: String,
    pub draft: RecordDraft,
    pub branches: Vec<Branch>,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionBatch {
    pub fn new(batch_id: impl Into<String>, draft: RecordDraft, branches: Vec<Branch>) -> Self {
        Self {
            batch_id: batch_id.into(),
            draft,
            branches,
            submitted_at: Utc::now(),
        }
    }

    /// Stable per batch and branch, so re-sending a branch re-sends the same id
    pub fn record_id(&self, branch: Branch) -> String {
        format!("{}-{}", self.batch_id, branch.code())
    }

    /// The record stored for one branch. New papers wait for moderation.
    pub fn record_for(&self, branch: Branch) -> Record {
        Record {
            id: self.record_id(branch),
            timestamp: self.submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            year: self.draft.year.trim().to_string(),
            semester: self.draft.semester.trim().to_string(),
            paper_code: self.draft.paper_code.trim().to_uppercase(),
            subject_name: self.draft.subject_name.trim().to_string(),
            paper_type: self.draft.type_label().to_string(),
            status: Status::Disabled,
            branch: branch.code().to_string(),
            email: self.draft.email.trim().to_lowercase(),
            pdf_url: self.draft.pdf_url.clone(),
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.branches.iter().map(|b| self.record_for(*b)).collect()
    }
}

/// A branch whose save did not go through
#[derive(Debug)]
pub struct BranchFailure {
    pub branch: Branch,
    pub error: AppError,
}

/// Per-branch result of a fan-out create
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub batch_id: String,
    /// (branch, stored record id)
    pub saved: Vec<(Branch, String)>,
    pub failed: Vec<BranchFailure>,
}

impl BatchOutcome {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_branches(&self) -> Vec<Branch> {
        self.failed.iter().map(|f| f.branch).collect()
    }

    pub fn saved_branches(&self) -> Vec<Branch> {
        self.saved.iter().map(|(b, _)| *b).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ValidationConfig {
        ValidationConfig::default()
    }

    fn draft() -> RecordDraft {
        RecordDraft {
            year: "2".into(),
            semester: "3".into(),
            paper_code: "bcs-3011".into(),
            subject_name: "Data Structures".into(),
            paper_type: Some(PaperType::Regular),
            email: "Student@Uni.edu".into(),
            pdf_url: Some("https://files.example/ds.pdf".into()),
        }
    }

    #[test]
    fn test_paper_code_parse() {
        let code = PaperCode::parse(" bcs-3011 ", &rules().paper_code_prefixes).unwrap();
        assert_eq!(code.prefix, "BCS");
        assert_eq!(code.to_string(), "BCS-3011");

        assert!(PaperCode::parse("BCS-301", &rules().paper_code_prefixes).is_err());
        assert!(PaperCode::parse("ZZZ-3011", &rules().paper_code_prefixes).is_err());
        assert!(PaperCode::parse("BCS3011", &rules().paper_code_prefixes).is_err());
    }

    #[test]
    fn test_draft_check() {
        assert!(draft().check(&rules()).is_ok());

        let mut bad = draft();
        bad.semester = "9".into();
        let err = bad.check(&rules()).unwrap_err();
        assert!(err.is_validation());

        let mut bad = draft();
        bad.email = "not-an-email".into();
        assert!(matches!(bad.check(&rules()), Err(AppError::Validation { .. })));

        let mut bad = draft();
        bad.subject_name = String::new();
        assert!(bad.check(&rules()).is_err());
    }

    #[test]
    fn test_pdf_upload_validation() {
        let ok = PdfUpload {
            file_name: "paper.PDF".into(),
            content_type: "application/pdf".into(),
            size_bytes: 1024,
        };
        assert!(ok.validate(2048).is_ok());
        assert!(ok.validate(512).is_err());

        let image = PdfUpload {
            file_name: "scan.png".into(),
            content_type: "image/png".into(),
            size_bytes: 10,
        };
        assert!(matches!(image.validate(2048), Err(AppError::InvalidUpload { .. })));
    }

    #[test]
    fn test_batch_records_share_fields() {
        let batch = SubmissionBatch::new("B1", draft(), vec![Branch::Cse, Branch::It]);
        let records = batch.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "B1-CSE");
        assert_eq!(records[1].id, "B1-IT");
        assert_eq!(records[0].paper_code, "BCS-3011");
        assert_eq!(records[0].email, "student@uni.edu");
        assert_eq!(records[0].status, Status::Disabled);
        assert_eq!(records[0].timestamp, records[1].timestamp);
        assert_ne!(records[0].dedup_key(), records[1].dedup_key());
    }
}
