//! Paper record entity

use super::{Branch, PaperType, Status};
use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column order of the legacy `||`-delimited table
pub const LEGACY_COLUMNS: [&str; 11] = [
    "timestamp",
    "id",
    "year",
    "semester",
    "paperCode",
    "pdfUrl",
    "subjectName",
    "type",
    "status",
    "branch",
    "email",
];

/// Field separator of the legacy table
pub const LEGACY_SEPARATOR: &str = "||";

/// One stored paper submission.
///
/// Display values are kept as the store sent them; comparison goes through the
/// normalized accessors. A row that could not be parsed yields a record with
/// empty fields, see [`Record::is_incomplete`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,

    #[serde(deserialize_with = "lenient::string")]
    pub timestamp: String,

    #[serde(deserialize_with = "lenient::string")]
    pub year: String,

    #[serde(deserialize_with = "lenient::string")]
    pub semester: String,

    #[serde(deserialize_with = "lenient::string")]
    pub paper_code: String,

    #[serde(deserialize_with = "lenient::string")]
    pub subject_name: String,

    #[serde(rename = "type", deserialize_with = "lenient::string")]
    pub paper_type: String,

    #[serde(deserialize_with = "lenient::status")]
    pub status: Status,

    #[serde(deserialize_with = "lenient::string")]
    pub branch: String,

    #[serde(deserialize_with = "lenient::string")]
    pub email: String,

    #[serde(deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl Record {
    /// Parse one canonical JSON row. Anything that is not an object degrades
    /// to an incomplete record instead of failing the whole list.
    pub fn parse(row: &serde_json::Value) -> Self {
        match Record::deserialize(row) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable record row, keeping it as incomplete");
                Record::default()
            }
        }
    }

    /// Parse one line of the legacy `||`-delimited table.
    pub fn parse_legacy(line: &str) -> Self {
        let fields: Vec<&str> = line.split(LEGACY_SEPARATOR).map(str::trim).collect();
        if fields.len() != LEGACY_COLUMNS.len() {
            tracing::warn!(
                fields = fields.len(),
                expected = LEGACY_COLUMNS.len(),
                "Legacy row has wrong field count"
            );
            return Record::default();
        }

        let pdf_url = Some(fields[5].to_string()).filter(|url| !url.is_empty());
        Record {
            timestamp: fields[0].to_string(),
            id: fields[1].to_string(),
            year: fields[2].to_string(),
            semester: fields[3].to_string(),
            paper_code: fields[4].to_string(),
            pdf_url,
            subject_name: fields[6].to_string(),
            paper_type: fields[7].to_string(),
            status: Status::parse(fields[8]),
            branch: fields[9].to_string(),
            email: fields[10].to_string(),
        }
    }

    /// Parse a whole legacy table, skipping blank lines
    pub fn parse_legacy_table(text: &str) -> Vec<Self> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(Record::parse_legacy)
            .collect()
    }

    /// Canonical JSON row, the inverse of [`Record::parse`]
    pub fn to_row(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Five-field duplicate detection key: year, semester, paper code, type, branch
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.year, &self.semester, &self.paper_code, &self.paper_type, &self.branch)
    }

    pub fn normalized_email(&self) -> String {
        normalize(&self.email)
    }

    pub fn normalized_branch(&self) -> String {
        normalize(&self.branch)
    }

    pub fn normalized_type(&self) -> String {
        normalize(&self.paper_type)
    }

    pub fn normalized_status(&self) -> String {
        normalize(self.status.as_str())
    }

    pub fn year_number(&self) -> Option<u32> {
        self.year.trim().parse().ok()
    }

    pub fn semester_number(&self) -> Option<u32> {
        self.semester.trim().parse().ok()
    }

    pub fn paper_type(&self) -> Option<PaperType> {
        PaperType::parse(&self.paper_type)
    }

    pub fn branch_code(&self) -> Option<Branch> {
        Branch::parse(&self.branch)
    }

    /// Creation instant, if the timestamp is RFC 3339
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.timestamp.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn is_enabled(&self) -> bool {
        self.status == Status::Enabled
    }

    /// Whether the PDF is available for download
    pub fn has_document(&self) -> bool {
        self.document_url().is_some()
    }

    /// The PDF link, unless it is missing or blank
    pub fn document_url(&self) -> Option<&str> {
        self.pdf_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    /// A record missing any identifying field (typically a malformed row)
    pub fn is_incomplete(&self) -> bool {
        [
            &self.id,
            &self.timestamp,
            &self.year,
            &self.semester,
            &self.paper_code,
            &self.subject_name,
            &self.branch,
            &self.email,
        ]
        .iter()
        .any(|field| field.trim().is_empty())
    }
}

/// Lower-cased, trimmed form used for every comparison
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Build the dedup key from raw field values
pub fn dedup_key(year: &str, semester: &str, paper_code: &str, paper_type: &str, branch: &str) -> String {
    [year, semester, paper_code, paper_type, branch]
        .iter()
        .map(|field| normalize(field))
        .collect::<Vec<_>>()
        .join("|")
}

/// Deserializers that accept what a spreadsheet-backed store actually sends:
/// numbers where strings are expected, nulls, and missing cells.
mod lenient {
    use super::Status;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        })
    }

    /// Null or missing is `None`; any present value is kept as sent, blank included
    pub fn optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        })
    }

    pub fn status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Status, D::Error> {
        Ok(Status::parse(&string(deserializer)?))
    }
}
