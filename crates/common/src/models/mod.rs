//! Domain models
//!
//! The paper record, its categorical fields, and the submission types that
//! produce new records.

mod draft;
mod record;

pub use draft::{BatchOutcome, BranchFailure, PaperCode, PdfUpload, RecordDraft, SubmissionBatch};
pub use record::{dedup_key, normalize, Record, LEGACY_COLUMNS, LEGACY_SEPARATOR};

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility status. Only `Enabled` records appear on public views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Enabled,
    #[default]
    Disabled,
}

impl Status {
    /// Lenient parse; anything that is not "enabled" is Disabled
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("enabled") {
            Status::Enabled
        } else {
            Status::Disabled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Enabled => "Enabled",
            Status::Disabled => "Disabled",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Status::Enabled => Status::Disabled,
            Status::Disabled => Status::Enabled,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enabled" => Ok(Status::Enabled),
            "disabled" => Ok(Status::Disabled),
            other => Err(AppError::Validation {
                message: format!("unknown status '{}'", other),
                field: Some("status".into()),
            }),
        }
    }
}

/// Exam type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaperType {
    Regular,
    Ex,
}

impl PaperType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "regular" => Some(PaperType::Regular),
            "ex" => Some(PaperType::Ex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaperType::Regular => "Regular",
            PaperType::Ex => "Ex",
        }
    }
}

impl fmt::Display for PaperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaperType::parse(s).ok_or_else(|| AppError::Validation {
            message: format!("unknown paper type '{}'", s.trim()),
            field: Some("type".into()),
        })
    }
}

/// Program codes a paper can be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "CSE")]
    Cse,
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "ECE")]
    Ece,
    #[serde(rename = "EEE")]
    Eee,
    #[serde(rename = "ME")]
    Me,
    #[serde(rename = "CE")]
    Ce,
    #[serde(rename = "AIML")]
    Aiml,
    #[serde(rename = "AIDS")]
    Aids,
    #[serde(rename = "CSBS")]
    Csbs,
    /// Applies to every branch
    #[serde(rename = "All_Branches")]
    AllBranches,
}

impl Branch {
    pub const ALL: [Branch; 10] = [
        Branch::Cse,
        Branch::It,
        Branch::Ece,
        Branch::Eee,
        Branch::Me,
        Branch::Ce,
        Branch::Aiml,
        Branch::Aids,
        Branch::Csbs,
        Branch::AllBranches,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Branch::Cse => "CSE",
            Branch::It => "IT",
            Branch::Ece => "ECE",
            Branch::Eee => "EEE",
            Branch::Me => "ME",
            Branch::Ce => "CE",
            Branch::Aiml => "AIML",
            Branch::Aids => "AIDS",
            Branch::Csbs => "CSBS",
            Branch::AllBranches => "All_Branches",
        }
    }

    /// Case-insensitive lookup by code
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Branch::ALL
            .iter()
            .copied()
            .find(|branch| branch.code().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Branch {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Branch::parse(s).ok_or_else(|| AppError::Validation {
            message: format!("unknown branch '{}'", s.trim()),
            field: Some("branch".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_defaults_to_disabled() {
        assert_eq!(Status::default(), Status::Disabled);
        assert_eq!(Status::parse(""), Status::Disabled);
        assert_eq!(Status::parse("  ENABLED "), Status::Enabled);
        assert_eq!(Status::parse("pending"), Status::Disabled);
        assert_eq!(Status::Enabled.toggled(), Status::Disabled);
    }

    #[test]
    fn test_status_from_str_is_strict() {
        assert!("enabled".parse::<Status>().is_ok());
        assert!("pending".parse::<Status>().is_err());
    }

    #[test]
    fn test_branch_parse() {
        assert_eq!(Branch::parse("cse"), Some(Branch::Cse));
        assert_eq!(Branch::parse("all_branches"), Some(Branch::AllBranches));
        assert_eq!(Branch::parse("XYZ"), None);
        assert_eq!(Branch::AllBranches.to_string(), "All_Branches");
    }

    #[test]
    fn test_paper_type() {
        assert_eq!("ex".parse::<PaperType>().unwrap(), PaperType::Ex);
        assert_eq!(PaperType::parse("Supplementary"), None);
    }
}
