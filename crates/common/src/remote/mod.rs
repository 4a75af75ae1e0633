//! Remote record store abstraction
//!
//! Every read and write of paper records goes through [`RecordGateway`]:
//! - `HttpGateway` talks to the spreadsheet-backed store over JSON/HTTP
//! - `MockGateway` keeps rows in memory, with injectable failures

mod http;
mod mock;
mod wire;

pub use http::HttpGateway;
pub use mock::MockGateway;

use crate::errors::{AppError, Result};
use crate::models::{normalize, BatchOutcome, Branch, BranchFailure, Record, Status, SubmissionBatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Query shape for `list`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListScope {
    pub year: Option<String>,
    pub semester: Option<String>,
    /// Empty means every branch
    pub branches: Vec<Branch>,
    pub status: Option<Status>,
    /// Only that submitter's rows, in any status
    pub submitter: Option<String>,
    /// Bypasses the Enabled-only visibility rule
    pub as_admin: bool,
}

impl ListScope {
    /// Public browse: Enabled records only
    pub fn public() -> Self {
        Self::default()
    }

    /// Moderation view: every status unless `status` narrows it
    pub fn admin() -> Self {
        Self {
            as_admin: true,
            ..Self::default()
        }
    }

    pub fn submitted_by(email: &str) -> Self {
        Self {
            submitter: Some(normalize(email)),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = Some(semester.into());
        self
    }

    pub fn with_branches(mut self, branches: Vec<Branch>) -> Self {
        self.branches = branches;
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether the store should return this record for the scope.
    ///
    /// A record filed under `All_Branches` matches any branch selection.
    pub fn matches(&self, record: &Record) -> bool {
        let visible = match (&self.submitter, self.as_admin) {
            (Some(email), _) => record.normalized_email() == normalize(email),
            (None, true) => true,
            (None, false) => record.is_enabled(),
        };
        if !visible {
            return false;
        }

        let status_ok = match (self.status, self.as_admin || self.submitter.is_some()) {
            (Some(status), true) => record.status == status,
            _ => true,
        };
        let year_ok = self
            .year
            .as_deref()
            .map_or(true, |y| record.year.trim() == y.trim());
        let semester_ok = self
            .semester
            .as_deref()
            .map_or(true, |s| record.semester.trim() == s.trim());
        let branch_ok = self.branches.is_empty()
            || match record.branch_code() {
                Some(Branch::AllBranches) => true,
                Some(branch) => self.branches.contains(&branch),
                None => false,
            };

        status_ok && year_ok && semester_ok && branch_ok
    }
}

/// Input of the advisory duplicate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceKey {
    pub year: String,
    pub semester: String,
    pub paper_code: String,
    pub paper_type: String,
    pub branches: Vec<Branch>,
}

impl ExistenceKey {
    /// Dedup key of the record this check would create for `branch`
    pub fn dedup_key_for(&self, branch: Branch) -> String {
        crate::models::dedup_key(
            &self.year,
            &self.semester,
            &self.paper_code,
            &self.paper_type,
            branch.code(),
        )
    }
}

/// Result of the advisory duplicate check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceCheck {
    pub exists: bool,
    pub conflicting_branches: Vec<Branch>,
}

/// Selector values offered by the store, without scanning the record set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub years: Vec<String>,
    #[serde(default)]
    pub sems: Vec<String>,
    #[serde(default)]
    pub branches: Vec<String>,
}

/// Operation contracts of the remote record store
#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Records matching the scope
    async fn list(&self, scope: &ListScope) -> Result<Vec<Record>>;

    /// Selector values (years, semesters, branches)
    async fn filter_options(&self) -> Result<FilterOptions>;

    /// Advisory pre-check; not atomic with `save`
    async fn check_exists(&self, key: &ExistenceKey) -> Result<ExistenceCheck>;

    /// Store one record; returns the id the store echoed back
    async fn save(&self, record: &Record) -> Result<String>;

    async fn update_status(&self, id: &str, status: Status) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Name for logs
    fn name(&self) -> &str;

    /// Fan a submission out to one stored record per branch, sequentially.
    ///
    /// Branch failures are collected, not raised. After a transport failure the
    /// remaining branches are reported failed without being attempted.
    async fn create(&self, batch: &SubmissionBatch) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::new(batch.batch_id.clone());
        let mut offline: Option<String> = None;

        for branch in &batch.branches {
            if let Some(message) = &offline {
                outcome.failed.push(BranchFailure {
                    branch: *branch,
                    error: AppError::Network { message: message.clone() },
                });
                continue;
            }

            let record = batch.record_for(*branch);
            match self.save(&record).await {
                Ok(id) => outcome.saved.push((*branch, id)),
                Err(error) => {
                    tracing::warn!(
                        gateway = self.name(),
                        batch_id = %batch.batch_id,
                        branch = %branch,
                        error = %error,
                        "Branch save failed"
                    );
                    if let AppError::Network { message } = &error {
                        offline = Some(message.clone());
                    }
                    outcome.failed.push(BranchFailure { branch: *branch, error });
                }
            }
        }

        tracing::info!(
            gateway = self.name(),
            batch_id = %batch.batch_id,
            saved = outcome.saved.len(),
            failed = outcome.failed.len(),
            "Submission batch processed"
        );
        Ok(outcome)
    }
}
