//! Confirm-then-reflect writes
//!
//! Every mutation goes to the gateway first. Only a confirmed change is
//! reflected in the cache, and then only in the scopes that already hold the
//! record. A failed call leaves the cache exactly as it was.

use super::form::SubmissionForm;
use crate::cache::{ClientCache, ScopeKey};
use crate::config::ValidationConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::models::{BatchOutcome, Status};
use crate::remote::{ExistenceCheck, RecordGateway};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

type PendingSet = Arc<Mutex<HashSet<String>>>;

fn lock(pending: &PendingSet) -> MutexGuard<'_, HashSet<String>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks an id busy until dropped, including when the owning future is dropped
struct PendingGuard {
    pending: PendingSet,
    id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.id);
    }
}

/// Bulk operation applied to each id in turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Toggle,
    Delete,
    SetStatus(Status),
}

/// Result for one id of a bulk run
#[derive(Debug)]
pub struct BulkOutcome {
    pub id: String,
    pub result: Result<()>,
}

impl BulkOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct MutationCoordinator {
    gateway: Arc<dyn RecordGateway>,
    cache: Arc<ClientCache>,
    pending: PendingSet,
    rules: ValidationConfig,
}

impl MutationCoordinator {
    pub fn new(gateway: Arc<dyn RecordGateway>, cache: Arc<ClientCache>, rules: ValidationConfig) -> Self {
        Self {
            gateway,
            cache,
            pending: Arc::default(),
            rules,
        }
    }

    fn acquire(&self, id: &str) -> Result<PendingGuard> {
        if !lock(&self.pending).insert(id.to_string()) {
            return Err(AppError::InFlight { id: id.to_string() });
        }
        Ok(PendingGuard {
            pending: self.pending.clone(),
            id: id.to_string(),
        })
    }

    pub fn is_pending(&self, id: &str) -> bool {
        lock(&self.pending).contains(id)
    }

    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.pending).iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Set a record's status; returns the scopes that were patched
    pub async fn set_status(&self, id: &str, status: Status) -> Result<Vec<ScopeKey>> {
        let _guard = self.acquire(id)?;
        self.apply_status(id, status).await
    }

    async fn apply_status(&self, id: &str, status: Status) -> Result<Vec<ScopeKey>> {
        if let Err(e) = self.gateway.update_status(id, status).await {
            warn!(id, status = %status, error = %e, "Status update rejected");
            record_mutation("set_status", false);
            return Err(e);
        }

        let mut patched = Vec::new();
        for scope in self.cache.scopes_containing(id).await {
            if self.cache.patch(&scope, id, |r| r.status = status).await {
                patched.push(scope);
            }
        }
        info!(id, status = %status, scopes = patched.len(), "Status updated");
        record_mutation("set_status", true);
        Ok(patched)
    }

    /// Flip the cached status of a record
    pub async fn toggle(&self, id: &str) -> Result<Status> {
        let _guard = self.acquire(id)?;
        let current = self.cache.find(id).await.ok_or_else(|| AppError::InvalidState {
            message: format!("record {} is not loaded", id),
        })?;
        let next = current.status.toggled();
        self.apply_status(id, next).await?;
        Ok(next)
    }

    /// Delete a record; returns the scopes it was removed from
    pub async fn remove(&self, id: &str) -> Result<Vec<ScopeKey>> {
        let _guard = self.acquire(id)?;
        if let Err(e) = self.gateway.delete(id).await {
            warn!(id, error = %e, "Delete rejected");
            record_mutation("delete", false);
            return Err(e);
        }

        let mut removed = Vec::new();
        for scope in self.cache.scopes_containing(id).await {
            if self.cache.remove(&scope, id).await {
                removed.push(scope);
            }
        }
        info!(id, scopes = removed.len(), "Record deleted");
        record_mutation("delete", true);
        Ok(removed)
    }

    /// Apply `action` to each id in order. Failures are reported per id and
    /// do not stop the run or undo earlier ids.
    pub async fn bulk(&self, ids: &[String], action: BulkAction) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            let result = match action {
                BulkAction::Toggle => self.toggle(id).await.map(|_| ()),
                BulkAction::Delete => self.remove(id).await.map(|_| ()),
                BulkAction::SetStatus(status) => self.set_status(id, status).await.map(|_| ()),
            };
            outcomes.push(BulkOutcome {
                id: id.clone(),
                result,
            });
        }

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(?action, total = ids.len(), failed, "Bulk run finished");
        outcomes
    }

    /// Run local validation and the advisory duplicate check
    pub async fn verify(&self, form: &mut SubmissionForm) -> Result<ExistenceCheck> {
        let key = form.begin_verify(&self.rules)?;
        match self.gateway.check_exists(&key).await {
            Ok(check) => {
                form.finish_verify(&check)?;
                record_mutation("verify", true);
                Ok(check)
            }
            Err(e) => {
                form.abort_verify()?;
                warn!(paper_code = %key.paper_code, error = %e, "Existence check failed");
                record_mutation("verify", false);
                Err(e)
            }
        }
    }

    /// Create the verified submission. No cache scope is touched; callers
    /// invalidate what the new records affect.
    pub async fn submit(&self, form: &mut SubmissionForm) -> Result<BatchOutcome> {
        let _guard = self.acquire(form.batch_id())?;
        let batch = form.begin_submit()?;

        match self.gateway.create(&batch).await {
            Ok(outcome) => {
                form.finish_submit(&outcome)?;
                record_mutation("submit", outcome.is_complete());
                if outcome.is_complete() {
                    info!(batch_id = %batch.batch_id, branches = outcome.saved.len(), "Submission saved");
                } else {
                    warn!(
                        batch_id = %batch.batch_id,
                        failed = ?outcome.failed_branches(),
                        "Submission partially saved"
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                form.fail(&e)?;
                warn!(batch_id = %batch.batch_id, error = %e, "Submission failed");
                record_mutation("submit", false);
                Err(e)
            }
        }
    }
}
