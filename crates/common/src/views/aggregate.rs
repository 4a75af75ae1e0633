//! Counts for dashboard widgets

use crate::models::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket for records with no value in the grouped field
pub const UNSET_BUCKET: &str = "(unset)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupKey {
    Year,
    Semester,
    Branch,
    Type,
    Status,
}

impl GroupKey {
    fn bucket(&self, record: &Record) -> String {
        let value = match self {
            GroupKey::Year => record.year.trim().to_string(),
            GroupKey::Semester => record.semester.trim().to_string(),
            GroupKey::Branch => record
                .branch_code()
                .map(|b| b.code().to_string())
                .unwrap_or_else(|| record.branch.trim().to_string()),
            GroupKey::Type => record
                .paper_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| record.paper_type.trim().to_string()),
            GroupKey::Status => record.status.as_str().to_string(),
        };
        if value.is_empty() {
            UNSET_BUCKET.to_string()
        } else {
            value
        }
    }
}

/// Count of records per value of `key`
pub fn aggregate(records: &[Record], key: GroupKey) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(key.bucket(record)).or_insert(0) += 1;
    }
    counts
}

/// Numbers behind the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// Rows that failed to parse into a complete record
    pub incomplete: usize,
    pub by_year: BTreeMap<String, usize>,
    pub by_semester: BTreeMap<String, usize>,
    pub by_branch: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

pub fn summarize(records: &[Record]) -> DashboardSummary {
    let enabled = records.iter().filter(|r| r.is_enabled()).count();
    DashboardSummary {
        total: records.len(),
        enabled,
        disabled: records.len() - enabled,
        incomplete: records.iter().filter(|r| r.is_incomplete()).count(),
        by_year: aggregate(records, GroupKey::Year),
        by_semester: aggregate(records, GroupKey::Semester),
        by_branch: aggregate(records, GroupKey::Branch),
        by_type: aggregate(records, GroupKey::Type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn record(year: &str, branch: &str, paper_type: &str, status: Status) -> Record {
        Record {
            id: format!("{}-{}", year, branch),
            timestamp: "2024-01-01T00:00:00Z".into(),
            year: year.into(),
            semester: "1".into(),
            paper_code: "BCS-1001".into(),
            subject_name: "Programming".into(),
            paper_type: paper_type.into(),
            branch: branch.into(),
            email: "s@uni.edu".into(),
            status,
            pdf_url: None,
        }
    }

    #[test]
    fn test_branch_buckets_use_canonical_code() {
        let records = vec![
            record("1", "cse", "Regular", Status::Enabled),
            record("1", "CSE", "Regular", Status::Enabled),
            record("2", "", "Regular", Status::Enabled),
        ];
        let counts = aggregate(&records, GroupKey::Branch);
        assert_eq!(counts.get("CSE"), Some(&2));
        assert_eq!(counts.get(UNSET_BUCKET), Some(&1));
    }

    #[test]
    fn test_status_buckets() {
        let records = vec![
            record("1", "IT", "Ex", Status::Enabled),
            record("1", "IT", "Ex", Status::Disabled),
            record("1", "IT", "Ex", Status::Disabled),
        ];
        let counts = aggregate(&records, GroupKey::Status);
        assert_eq!(counts.get("Enabled"), Some(&1));
        assert_eq!(counts.get("Disabled"), Some(&2));
    }

    #[test]
    fn test_summarize() {
        let records = vec![
            record("1", "IT", "regular", Status::Enabled),
            record("2", "ECE", "Ex", Status::Disabled),
            Record::default(),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.enabled, 1);
        assert_eq!(summary.disabled, 2);
        assert_eq!(summary.incomplete, 1);
        assert_eq!(summary.by_type.get("Regular"), Some(&1));
        assert_eq!(summary.by_year.get(UNSET_BUCKET), Some(&1));
    }
}
