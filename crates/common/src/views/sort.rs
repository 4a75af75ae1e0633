//! Record ordering

use crate::errors::AppError;
use crate::models::{normalize, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Primary sort field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Year,
    Semester,
    PaperCode,
    SubjectName,
    Branch,
    Type,
    Status,
    Email,
    Timestamp,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "year" => Ok(SortKey::Year),
            "sem" | "semester" => Ok(SortKey::Semester),
            "code" | "papercode" => Ok(SortKey::PaperCode),
            "subject" | "subjectname" => Ok(SortKey::SubjectName),
            "branch" => Ok(SortKey::Branch),
            "type" => Ok(SortKey::Type),
            "status" => Ok(SortKey::Status),
            "email" => Ok(SortKey::Email),
            "time" | "timestamp" => Ok(SortKey::Timestamp),
            other => Err(AppError::Validation {
                message: format!("unknown sort key '{}'", other),
                field: Some("sort".into()),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Order among records equal on the primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
    /// Year descending, then semester ascending. Skipped when the primary
    /// key is year or semester.
    #[default]
    YearDescSemesterAsc,
    /// Keep input order
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
    pub tie_break: TieBreak,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self {
            key,
            direction,
            tie_break: TieBreak::default(),
        }
    }

    fn tie_break_applies(&self) -> bool {
        self.tie_break == TieBreak::YearDescSemesterAsc
            && !matches!(self.key, SortKey::Year | SortKey::Semester)
    }
}

impl Default for SortSpec {
    /// Newest papers first
    fn default() -> Self {
        Self::new(SortKey::Timestamp, SortDirection::Descending)
    }
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Parsed values in `direction`, then the unparseable ones in either
/// direction, among themselves by text
fn parsed_first<T: Ord>(
    a: (Option<T>, &str),
    b: (Option<T>, &str),
    direction: SortDirection,
) -> Ordering {
    match (a.0, b.0) {
        (Some(x), Some(y)) => direction.apply(x.cmp(&y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => direction.apply(compare_text(a.1, b.1)),
    }
}

fn compare_numeric(a: &str, b: &str, direction: SortDirection) -> Ordering {
    let number = |s: &str| s.trim().parse::<u64>().ok();
    parsed_first((number(a), a), (number(b), b), direction)
}

fn compare_text(a: &str, b: &str) -> Ordering {
    normalize(a).cmp(&normalize(b))
}

fn compare_by(key: SortKey, a: &Record, b: &Record, direction: SortDirection) -> Ordering {
    let text = |x: &str, y: &str| direction.apply(compare_text(x, y));
    match key {
        SortKey::Year => compare_numeric(&a.year, &b.year, direction),
        SortKey::Semester => compare_numeric(&a.semester, &b.semester, direction),
        SortKey::PaperCode => text(&a.paper_code, &b.paper_code),
        SortKey::SubjectName => text(&a.subject_name, &b.subject_name),
        SortKey::Branch => text(&a.branch, &b.branch),
        SortKey::Type => text(&a.paper_type, &b.paper_type),
        SortKey::Status => direction.apply(a.status.as_str().cmp(b.status.as_str())),
        SortKey::Email => text(&a.email, &b.email),
        SortKey::Timestamp => parsed_first(
            (a.created_at(), a.timestamp.as_str()),
            (b.created_at(), b.timestamp.as_str()),
            direction,
        ),
    }
}

/// Stable sort into a new vector.
///
/// Years, semesters and timestamps that do not parse sort last whatever the
/// direction.
pub fn sort(records: &[Record], spec: &SortSpec) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        let primary = compare_by(spec.key, a, b, spec.direction);
        if !spec.tie_break_applies() {
            return primary;
        }
        primary
            .then_with(|| compare_numeric(&a.year, &b.year, SortDirection::Descending))
            .then_with(|| compare_numeric(&a.semester, &b.semester, SortDirection::Ascending))
    });
    sorted
}
