//! JSON wire shapes of the remote store

use super::{ExistenceKey, FilterOptions, ListScope};
use crate::errors::{AppError, Result};
use crate::models::{Branch, Record, Status};
use serde::{Deserialize, Serialize};

/// Query pairs for `GET ?action=list`
pub(crate) fn list_query(scope: &ListScope) -> Vec<(&'static str, String)> {
    let mut query = vec![("action", "list".to_string())];
    if let Some(year) = &scope.year {
        query.push(("year", year.trim().to_string()));
    }
    if let Some(semester) = &scope.semester {
        query.push(("semester", semester.trim().to_string()));
    }
    if !scope.branches.is_empty() {
        let branches: Vec<&str> = scope.branches.iter().map(Branch::code).collect();
        query.push(("branch", branches.join(",")));
    }
    if let Some(status) = scope.status {
        query.push(("status", status.as_str().to_string()));
    }
    if let Some(email) = &scope.submitter {
        query.push(("email", email.clone()));
    }
    query.push(("admin", scope.as_admin.to_string()));
    query
}

#[derive(Serialize)]
pub(crate) struct SaveRequest<'a> {
    pub action: &'static str,
    #[serde(flatten)]
    pub record: &'a Record,
}

impl<'a> SaveRequest<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { action: "save", record }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckRequest<'a> {
    pub action: &'static str,
    pub year: &'a str,
    pub semester: &'a str,
    pub paper_code: &'a str,
    #[serde(rename = "type")]
    pub paper_type: &'a str,
    pub branches: Vec<&'static str>,
}

impl<'a> CheckRequest<'a> {
    pub fn new(key: &'a ExistenceKey) -> Self {
        Self {
            action: "check",
            year: &key.year,
            semester: &key.semester,
            paper_code: &key.paper_code,
            paper_type: &key.paper_type,
            branches: key.branches.iter().map(Branch::code).collect(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct UpdateStatusRequest<'a> {
    pub action: &'static str,
    pub id: &'a str,
    pub status: Status,
}

impl<'a> UpdateStatusRequest<'a> {
    pub fn new(id: &'a str, status: Status) -> Self {
        Self { action: "updateStatus", id, status }
    }
}

#[derive(Serialize)]
pub(crate) struct DeleteRequest<'a> {
    pub action: &'static str,
    pub id: &'a str,
}

impl<'a> DeleteRequest<'a> {
    pub fn new(id: &'a str) -> Self {
        Self { action: "deleteRow", id }
    }
}

/// Every response: `{status: "success"|"error"|"exists", ...}`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    #[serde(default)]
    pub options: Option<FilterOptions>,
    /// Conflicting branches of a `check` or `save` answered with "exists"
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| AppError::MalformedResponse {
            message: format!("{} (body starts with {:?})", e, body.chars().take(40).collect::<String>()),
        })
    }

    /// Turn an "error" status into `Application`, keep success and exists
    pub fn accept(self) -> Result<Self> {
        match self.status.trim().to_lowercase().as_str() {
            "success" | "exists" => Ok(self),
            "error" => Err(AppError::Application { message: self.message }),
            other => Err(AppError::MalformedResponse {
                message: format!("unknown response status '{}'", other),
            }),
        }
    }

    pub fn is_exists(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("exists")
    }

    pub fn records(&self) -> Vec<Record> {
        self.rows.iter().map(Record::parse).collect()
    }

    /// Known branches among the reported conflicts
    pub fn conflicting_branches(&self) -> Vec<Branch> {
        self.branches.iter().filter_map(|b| Branch::parse(b)).collect()
    }

    /// Echoed id, which spreadsheet stores sometimes send as a number
    pub fn echoed_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
