//! Scoped client cache
//!
//! Provides:
//! - One immutable record snapshot per logical scope
//! - Copy-and-replace writes (`put`, `patch`, `remove`, `invalidate`)
//! - Scalar filter selections kept for the session
//! - Serializable snapshots for hosts that persist session storage

mod registry;

pub use registry::CacheRegistry;

use crate::errors::Result;
use crate::metrics;
use crate::models::Record;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Name of one cached query shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ScopeKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Records of one scope. Shared and never mutated in place.
pub type Snapshot = Arc<[Record]>;

/// Serializable copy of the whole cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub scopes: BTreeMap<ScopeKey, Vec<Record>>,
    #[serde(default)]
    pub selections: BTreeMap<String, String>,
}

/// Process-local record cache keyed by scope.
///
/// Entries stay fresh until replaced or invalidated; there is no TTL. Scopes
/// are independent: writing one never touches another, even when they hold
/// the same record ids.
#[derive(Debug, Default)]
pub struct ClientCache {
    scopes: RwLock<HashMap<ScopeKey, Snapshot>>,
    selections: RwLock<HashMap<String, String>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached records of a scope
    pub async fn get(&self, scope: &ScopeKey) -> Option<Snapshot> {
        let hit = self.scopes.read().await.get(scope).cloned();
        metrics::record_cache(hit.is_some(), scope.as_str());
        debug!(scope = %scope, hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Replace a scope wholesale; the only bulk-write path
    pub async fn put(&self, scope: ScopeKey, records: Vec<Record>) -> Snapshot {
        let snapshot: Snapshot = records.into();
        debug!(scope = %scope, count = snapshot.len(), "Cache put");
        self.scopes.write().await.insert(scope, snapshot.clone());
        snapshot
    }

    /// Apply `updater` to the one record with `id` in `scope`.
    ///
    /// Returns false when the scope is not cached or does not hold the id.
    pub async fn patch<F>(&self, scope: &ScopeKey, id: &str, updater: F) -> bool
    where
        F: FnOnce(&mut Record),
    {
        let mut scopes = self.scopes.write().await;
        let Some(current) = scopes.get(scope) else {
            return false;
        };
        let Some(index) = current.iter().position(|r| r.id == id) else {
            return false;
        };

        let mut records = current.to_vec();
        updater(&mut records[index]);
        scopes.insert(scope.clone(), records.into());
        debug!(scope = %scope, id, "Cache patch");
        true
    }

    /// Drop the record with `id` from `scope`
    pub async fn remove(&self, scope: &ScopeKey, id: &str) -> bool {
        let mut scopes = self.scopes.write().await;
        let Some(current) = scopes.get(scope) else {
            return false;
        };
        if !current.iter().any(|r| r.id == id) {
            return false;
        }

        let records: Vec<Record> = current.iter().filter(|r| r.id != id).cloned().collect();
        scopes.insert(scope.clone(), records.into());
        debug!(scope = %scope, id, "Cache remove");
        true
    }

    /// Forget a scope so the next read goes to the gateway
    pub async fn invalidate(&self, scope: &ScopeKey) -> bool {
        let removed = self.scopes.write().await.remove(scope).is_some();
        debug!(scope = %scope, removed, "Cache invalidate");
        removed
    }

    /// Scopes currently holding a record with `id`
    pub async fn scopes_containing(&self, id: &str) -> Vec<ScopeKey> {
        let mut keys: Vec<ScopeKey> = self
            .scopes
            .read()
            .await
            .iter()
            .filter(|(_, records)| records.iter().any(|r| r.id == id))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// First cached copy of a record, searching scopes in key order
    pub async fn find(&self, id: &str) -> Option<Record> {
        let scopes = self.scopes.read().await;
        let mut keys: Vec<&ScopeKey> = scopes.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| scopes.get(key))
            .find_map(|records| records.iter().find(|r| r.id == id).cloned())
    }

    pub async fn scope_keys(&self) -> Vec<ScopeKey> {
        let mut keys: Vec<ScopeKey> = self.scopes.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Read-through helper: cached snapshot, or `loader` then `put`
    pub async fn get_or_load<F, Fut>(&self, scope: &ScopeKey, loader: F) -> Result<Snapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Record>>>,
    {
        if let Some(cached) = self.get(scope).await {
            return Ok(cached);
        }

        let records = loader().await?;
        Ok(self.put(scope.clone(), records).await)
    }

    /// Remember a scalar filter selection (e.g. `admin_year`)
    pub async fn set_selection(&self, key: impl Into<String>, value: impl Into<String>) {
        self.selections.write().await.insert(key.into(), value.into());
    }

    pub async fn selection(&self, key: &str) -> Option<String> {
        self.selections.read().await.get(key).cloned()
    }

    pub async fn clear_selection(&self, key: &str) {
        self.selections.write().await.remove(key);
    }

    /// Drop every scope and selection
    pub async fn clear(&self) {
        self.scopes.write().await.clear();
        self.selections.write().await.clear();
        debug!("Cache cleared");
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        let scopes = self
            .scopes
            .read()
            .await
            .iter()
            .map(|(key, records)| (key.clone(), records.to_vec()))
            .collect();
        let selections = self
            .selections
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        CacheSnapshot { scopes, selections }
    }

    /// Replace all contents with a previously taken snapshot
    pub async fn restore(&self, snapshot: CacheSnapshot) {
        let mut scopes = self.scopes.write().await;
        scopes.clear();
        for (key, records) in snapshot.scopes {
            scopes.insert(key, records.into());
        }
        drop(scopes);

        let mut selections = self.selections.write().await;
        selections.clear();
        selections.extend(snapshot.selections);
    }
}

/// Scope and selection key builders
pub mod keys {
    use super::ScopeKey;
    use crate::models::normalize;
    use crate::remote::ListScope;

    pub const ADMIN_YEAR: &str = "admin_year";
    pub const ADMIN_SEMESTER: &str = "admin_sem";
    pub const ADMIN_BRANCH: &str = "admin_branch";

    /// Public browse list
    pub fn public() -> ScopeKey {
        ScopeKey::new("public")
    }

    /// One user's own submissions
    pub fn submissions(email: &str) -> ScopeKey {
        ScopeKey::new(format!("submissions_{}", normalize(email)))
    }

    /// Admin moderation list for one filter combination
    pub fn admin(scope: &ListScope) -> ScopeKey {
        let part = |value: Option<&str>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "all".to_string())
        };
        let branches = if scope.branches.is_empty() {
            "all".to_string()
        } else {
            scope.branches.iter().map(|b| b.code()).collect::<Vec<_>>().join("+")
        };
        ScopeKey::new(format!(
            "admin_{}_{}_{}_{}",
            part(scope.year.as_deref()),
            part(scope.semester.as_deref()),
            branches,
            part(scope.status.map(|s| s.as_str())),
        ))
    }

    /// Dashboard records; the admin view includes Disabled rows and is kept apart
    pub fn dashboard(as_admin: bool) -> ScopeKey {
        if as_admin {
            ScopeKey::new("dashboardData_admin")
        } else {
            ScopeKey::new("dashboardData")
        }
    }

    pub fn leaderboard() -> ScopeKey {
        ScopeKey::new("leaderboardData")
    }
}
