//! Record filtering

use crate::errors::AppError;
use crate::models::{normalize, Record, Status};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Field searched by free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchField {
    #[default]
    SubjectName,
    PaperCode,
    Branch,
    Type,
    Year,
    Semester,
    Email,
}

impl SearchField {
    fn value<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            SearchField::SubjectName => &record.subject_name,
            SearchField::PaperCode => &record.paper_code,
            SearchField::Branch => &record.branch,
            SearchField::Type => &record.paper_type,
            SearchField::Year => &record.year,
            SearchField::Semester => &record.semester,
            SearchField::Email => &record.email,
        }
    }
}

impl FromStr for SearchField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "subject" | "subjectname" => Ok(SearchField::SubjectName),
            "code" | "papercode" => Ok(SearchField::PaperCode),
            "branch" => Ok(SearchField::Branch),
            "type" => Ok(SearchField::Type),
            "year" => Ok(SearchField::Year),
            "sem" | "semester" => Ok(SearchField::Semester),
            "email" => Ok(SearchField::Email),
            other => Err(AppError::Validation {
                message: format!("unknown search field '{}'", other),
                field: Some("search_field".into()),
            }),
        }
    }
}

/// Case-insensitive substring match on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSearch {
    pub field: SearchField,
    pub needle: String,
}

impl TextSearch {
    pub fn new(field: SearchField, needle: impl Into<String>) -> Self {
        Self {
            field,
            needle: needle.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let needle = normalize(&self.needle);
        needle.is_empty() || self.field.value(record).to_lowercase().contains(&needle)
    }
}

/// Conjunction of optional conditions. An empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub status: Option<Status>,
    pub year: Option<String>,
    pub semester: Option<String>,
    pub branch: Option<String>,
    pub paper_type: Option<String>,
    pub search: Option<TextSearch>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = Some(semester.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn paper_type(mut self, paper_type: impl Into<String>) -> Self {
        self.paper_type = Some(paper_type.into());
        self
    }

    pub fn search(mut self, field: SearchField, needle: impl Into<String>) -> Self {
        self.search = Some(TextSearch::new(field, needle));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.status.map_or(true, |s| record.status == s)
            && self.year.as_deref().map_or(true, |y| record.year.trim() == y.trim())
            && self
                .semester
                .as_deref()
                .map_or(true, |s| record.semester.trim() == s.trim())
            && self
                .branch
                .as_deref()
                .map_or(true, |b| record.normalized_branch() == normalize(b))
            && self
                .paper_type
                .as_deref()
                .map_or(true, |t| record.normalized_type() == normalize(t))
            && self.search.as_ref().map_or(true, |s| s.matches(record))
    }
}

/// Records satisfying `predicate`, in their original order
pub fn filter(records: &[Record], predicate: &RecordFilter) -> Vec<Record> {
    records.iter().filter(|r| predicate.matches(r)).cloned().collect()
}

/// One submitter's records, any status
pub fn submissions_of(records: &[Record], email: &str) -> Vec<Record> {
    let email = normalize(email);
    records
        .iter()
        .filter(|r| r.normalized_email() == email)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, year: &str, branch: &str, subject: &str, status: Status) -> Record {
        Record {
            id: id.into(),
            year: year.into(),
            semester: "1".into(),
            branch: branch.into(),
            subject_name: subject.into(),
            paper_type: "Regular".into(),
            email: "S@Uni.edu".into(),
            status,
            ..Default::default()
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("1", "1", "CSE", "Data Structures", Status::Enabled),
            record("2", "2", "it", "Digital Logic", Status::Enabled),
            record("3", "1", "cse", "Discrete Maths", Status::Disabled),
            record("4", "1", "ECE", "Data Communication", Status::Enabled),
        ]
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let records = sample();
        assert_eq!(filter(&records, &RecordFilter::new()), records);
    }

    #[test]
    fn test_branch_is_case_insensitive() {
        let out = filter(&sample(), &RecordFilter::new().branch("Cse"));
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn test_conjunction_preserves_order() {
        let predicate = RecordFilter::new()
            .status(Status::Enabled)
            .year("1")
            .search(SearchField::SubjectName, "DATA");
        assert_eq!(ids(&filter(&sample(), &predicate)), vec!["1", "4"]);
    }

    #[test]
    fn test_type_equality_normalized() {
        assert_eq!(filter(&sample(), &RecordFilter::new().paper_type(" regular ")).len(), 4);
        assert!(filter(&sample(), &RecordFilter::new().paper_type("Ex")).is_empty());
    }

    #[test]
    fn test_search_other_fields() {
        let out = filter(&sample(), &RecordFilter::new().search(SearchField::Branch, "IT"));
        assert_eq!(ids(&out), vec!["2"]);
        let out = filter(&sample(), &RecordFilter::new().search(SearchField::Email, "uni.EDU"));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_submissions_of_normalizes_email() {
        let mut records = sample();
        records[1].email = "other@uni.edu".into();
        assert_eq!(ids(&submissions_of(&records, " s@uni.edu ")), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_search_field_from_str() {
        assert_eq!("code".parse::<SearchField>().unwrap(), SearchField::PaperCode);
        assert!("colour".parse::<SearchField>().is_err());
    }
}
