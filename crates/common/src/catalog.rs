//! Read-through record loading
//!
//! Binds each named cache scope to a gateway query and gates admin scopes on
//! the current identity. Screens ask the catalog for a snapshot and derive
//! their views from it.

use crate::cache::{keys, ClientCache, ScopeKey, Snapshot};
use crate::errors::{AppError, Result};
use crate::identity::IdentityProvider;
use crate::models::{normalize, Branch};
use crate::remote::{FilterOptions, ListScope, RecordGateway};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Catalog {
    gateway: Arc<dyn RecordGateway>,
    cache: Arc<ClientCache>,
    identity: Arc<dyn IdentityProvider>,
}

impl Catalog {
    pub fn new(
        gateway: Arc<dyn RecordGateway>,
        cache: Arc<ClientCache>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            gateway,
            cache,
            identity,
        }
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    pub fn gateway(&self) -> &Arc<dyn RecordGateway> {
        &self.gateway
    }

    /// Check the current user may issue this query
    fn authorize(&self, scope: &ListScope) -> Result<()> {
        if scope.as_admin {
            self.identity.require_admin()?;
        }
        if let Some(submitter) = &scope.submitter {
            let user = self.identity.require_user()?;
            if user.normalized_email() != normalize(submitter) && !user.is_admin {
                return Err(AppError::Forbidden {
                    message: "cannot list another user's submissions".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Cached snapshot of `key`, fetched with `scope` on a miss or when `refresh` is set
    pub async fn load(&self, key: ScopeKey, scope: &ListScope, refresh: bool) -> Result<Snapshot> {
        self.authorize(scope)?;
        if refresh {
            self.cache.invalidate(&key).await;
        }

        let snapshot = self
            .cache
            .get_or_load(&key, || self.gateway.list(scope))
            .await?;
        debug!(scope = %key, count = snapshot.len(), refresh, "Scope loaded");
        Ok(snapshot)
    }

    /// Load several scopes concurrently
    pub async fn load_many(&self, requests: Vec<(ScopeKey, ListScope)>, refresh: bool) -> Result<Vec<Snapshot>> {
        try_join_all(
            requests
                .iter()
                .map(|(key, scope)| self.load(key.clone(), scope, refresh)),
        )
        .await
    }

    /// Enabled papers for browsing
    pub async fn public(&self, refresh: bool) -> Result<Snapshot> {
        self.load(keys::public(), &ListScope::public(), refresh).await
    }

    /// The signed-in user's submissions, any status
    pub async fn my_submissions(&self, refresh: bool) -> Result<Snapshot> {
        let user = self.identity.require_user()?;
        self.load(
            keys::submissions(&user.email),
            &ListScope::submitted_by(&user.email),
            refresh,
        )
        .await
    }

    /// Moderation list; the year, semester and branch selection is remembered
    pub async fn admin(&self, scope: ListScope, refresh: bool) -> Result<Snapshot> {
        let scope = ListScope { as_admin: true, ..scope };
        self.authorize(&scope)?;
        self.remember_selection(&scope).await;
        self.load(keys::admin(&scope), &scope, refresh).await
    }

    /// Admin scope built from the remembered selection
    pub async fn remembered_admin_scope(&self) -> ListScope {
        let mut scope = ListScope::admin();
        scope.year = self.cache.selection(keys::ADMIN_YEAR).await;
        scope.semester = self.cache.selection(keys::ADMIN_SEMESTER).await;
        if let Some(branches) = self.cache.selection(keys::ADMIN_BRANCH).await {
            scope.branches = branches.split(',').filter_map(Branch::parse).collect();
        }
        scope
    }

    async fn remember_selection(&self, scope: &ListScope) {
        let pairs = [
            (keys::ADMIN_YEAR, scope.year.clone()),
            (keys::ADMIN_SEMESTER, scope.semester.clone()),
            (
                keys::ADMIN_BRANCH,
                (!scope.branches.is_empty()).then(|| {
                    scope.branches.iter().map(Branch::code).collect::<Vec<_>>().join(",")
                }),
            ),
        ];
        for (key, value) in pairs {
            match value {
                Some(value) => self.cache.set_selection(key, value).await,
                None => self.cache.clear_selection(key).await,
            }
        }
    }

    /// Dashboard data: every record for admins, Enabled ones otherwise
    pub async fn dashboard(&self, refresh: bool) -> Result<Snapshot> {
        let is_admin = self.identity.current().is_some_and(|u| u.is_admin);
        let scope = if is_admin { ListScope::admin() } else { ListScope::public() };
        self.load(keys::dashboard(is_admin), &scope, refresh).await
    }

    /// Records the leaderboard is ranked from
    pub async fn leaderboard(&self, refresh: bool) -> Result<Snapshot> {
        self.load(keys::leaderboard(), &ListScope::public(), refresh).await
    }

    pub async fn filter_options(&self) -> Result<FilterOptions> {
        self.gateway.filter_options().await
    }

    /// Forget the scopes a new submission by `email` lands in.
    ///
    /// New records are Disabled, so public and leaderboard scopes stay valid.
    pub async fn invalidate_after_submit(&self, email: &str) {
        let mut affected = vec![keys::submissions(email), keys::dashboard(false), keys::dashboard(true)];
        affected.extend(
            self.cache
                .scope_keys()
                .await
                .into_iter()
                .filter(|key| key.as_str().starts_with("admin_")),
        );
        for key in &affected {
            self.cache.invalidate(key).await;
        }
        info!(scopes = affected.len(), "Invalidated scopes after submission");
    }
}
