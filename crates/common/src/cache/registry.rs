//! Session lifecycle of the client cache

use super::ClientCache;
use crate::errors::{AppError, Result};
use crate::identity::User;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Owns the one cache of a session.
///
/// Built once and handed to whoever needs it; `init` at start-up, `reset` at
/// sign-out. Reads through `cache()` fail until `init` has run.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    cache: Arc<ClientCache>,
    initialized: AtomicBool,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session started and hand out the cache
    pub fn init(&self) -> Arc<ClientCache> {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            info!("Client cache initialized");
        }
        self.cache.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> Result<Arc<ClientCache>> {
        if !self.is_initialized() {
            return Err(AppError::InvalidState {
                message: "cache registry used before init".to_string(),
            });
        }
        Ok(self.cache.clone())
    }

    /// Drop every scope and selection. The registry stays initialized.
    pub async fn reset(&self) {
        self.cache.clear().await;
        info!("Client cache reset");
    }

    /// Reset whenever the signed-in user goes away or changes.
    ///
    /// The starting user is read before the task is spawned, so a change made
    /// right after this call is still seen. The task ends when the identity
    /// sender is dropped.
    pub fn watch_identity(self: Arc<Self>, mut identity: watch::Receiver<Option<User>>) -> JoinHandle<()> {
        let mut current = identity.borrow_and_update().as_ref().map(User::normalized_email);
        tokio::spawn(async move {
            while identity.changed().await.is_ok() {
                let next = identity.borrow_and_update().as_ref().map(User::normalized_email);
                let signed_out_or_switched = current.is_some() && next != current;
                if signed_out_or_switched {
                    info!(previous = ?current, next = ?next, "Identity changed, resetting cache");
                    self.reset().await;
                }
                current = next;
            }
        })
    }
}
