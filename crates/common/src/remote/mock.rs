//! In-memory record store for tests and offline use

use super::{ExistenceCheck, ExistenceKey, FilterOptions, ListScope, RecordGateway};
use crate::errors::{AppError, Result};
use crate::models::{Record, Status};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Gateway backed by a `Vec<Record>`.
///
/// Failures can be injected per id (`fail_on`) or globally (`set_offline`),
/// and every call is logged so tests can assert on ordering.
#[derive(Default)]
pub struct MockGateway {
    rows: Mutex<Vec<Record>>,
    failing_ids: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            rows: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Reject every write touching `id` with an application error
    pub fn fail_on(&self, id: impl Into<String>) {
        lock(&self.failing_ids).insert(id.into());
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Current stored rows
    pub fn records(&self) -> Vec<Record> {
        lock(&self.rows).clone()
    }

    /// Calls made so far, as "action:target"
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn enter(&self, call: String) -> Result<()> {
        lock(&self.calls).push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Network {
                message: "mock store is offline".to_string(),
            });
        }
        Ok(())
    }

    fn check_failure(&self, id: &str) -> Result<()> {
        if lock(&self.failing_ids).contains(id) {
            return Err(AppError::application(format!("store rejected {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordGateway for MockGateway {
    async fn list(&self, scope: &ListScope) -> Result<Vec<Record>> {
        self.enter("list".to_string())?;
        Ok(lock(&self.rows)
            .iter()
            .filter(|r| scope.matches(r))
            .cloned()
            .collect())
    }

    async fn filter_options(&self) -> Result<FilterOptions> {
        self.enter("getFilters".to_string())?;
        let rows = lock(&self.rows);
        let collect = |field: fn(&Record) -> &str| -> Vec<String> {
            rows.iter()
                .map(|r| field(r).trim().to_string())
                .filter(|v| !v.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        Ok(FilterOptions {
            years: collect(|r| r.year.as_str()),
            sems: collect(|r| r.semester.as_str()),
            branches: collect(|r| r.branch.as_str()),
        })
    }

    async fn check_exists(&self, key: &ExistenceKey) -> Result<ExistenceCheck> {
        self.enter(format!("check:{}", key.paper_code))?;
        let rows = lock(&self.rows);
        let existing: HashSet<String> = rows.iter().map(Record::dedup_key).collect();
        let conflicting: Vec<_> = key
            .branches
            .iter()
            .copied()
            .filter(|b| existing.contains(&key.dedup_key_for(*b)))
            .collect();
        Ok(ExistenceCheck {
            exists: !conflicting.is_empty(),
            conflicting_branches: conflicting,
        })
    }

    async fn save(&self, record: &Record) -> Result<String> {
        self.enter(format!("save:{}", record.id))?;
        self.check_failure(&record.id)?;

        let mut rows = lock(&self.rows);
        if rows.iter().any(|r| r.id == record.id) {
            // Same id re-sent: already stored
            return Ok(record.id.clone());
        }
        let key = record.dedup_key();
        if rows.iter().any(|r| r.dedup_key() == key) {
            return Err(AppError::Conflict {
                branches: vec![record.branch.clone()],
            });
        }
        rows.push(record.clone());
        Ok(record.id.clone())
    }

    async fn update_status(&self, id: &str, status: Status) -> Result<()> {
        self.enter(format!("updateStatus:{}", id))?;
        self.check_failure(id)?;

        let mut rows = lock(&self.rows);
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::application(format!("record {} not found", id)))?;
        row.status = status;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.enter(format!("deleteRow:{}", id))?;
        self.check_failure(id)?;

        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(AppError::application(format!("record {} not found", id)));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
