//! Identity boundary
//!
//! Provides:
//! - The signed-in user as seen by the data layer
//! - Admin resolution from a configured allowlist, once at sign-in
//! - A watchable session so the cache can reset on sign-out or user switch

use crate::config::IdentityConfig;
use crate::errors::{AppError, Result};
use crate::models::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::info;

/// Current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn normalized_email(&self) -> String {
        normalize(&self.email)
    }

    /// Require the admin flag, returning Forbidden otherwise
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: format!("{} is not an admin", self.email.trim()),
            })
        }
    }
}

/// Source of the current user
pub trait IdentityProvider: Send + Sync {
    /// Synchronous snapshot
    fn current(&self) -> Option<User>;

    /// Change notifications; the initial value is the current user
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    fn require_user(&self) -> Result<User> {
        self.current().ok_or_else(|| AppError::Forbidden {
            message: "sign in required".to_string(),
        })
    }

    fn require_admin(&self) -> Result<User> {
        let user = self.require_user()?;
        user.require_admin()?;
        Ok(user)
    }
}

/// Emails granted the admin flag
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(&config.admin_emails)
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }
}

/// In-process session holding at most one signed-in user
pub struct SessionIdentity {
    allowlist: AdminAllowlist,
    sender: watch::Sender<Option<User>>,
}

impl SessionIdentity {
    pub fn new(allowlist: AdminAllowlist) -> Self {
        let (sender, _) = watch::channel(None);
        Self { allowlist, sender }
    }

    /// Sign in, resolving the admin flag now; returns the new user
    pub fn sign_in(&self, email: &str, display_name: &str, photo_url: Option<String>) -> Result<User> {
        let email = normalize(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation {
                message: format!("'{}' is not an email address", email),
                field: Some("email".into()),
            });
        }

        let user = User {
            is_admin: self.allowlist.is_admin(&email),
            display_name: display_name.trim().to_string(),
            photo_url,
            email,
        };
        info!(email = %user.email, is_admin = user.is_admin, "Signed in");
        self.sender.send_replace(Some(user.clone()));
        Ok(user)
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.sender.send_replace(None) {
            info!(email = %previous.email, "Signed out");
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current(&self) -> Option<User> {
        self.sender.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionIdentity {
        SessionIdentity::new(AdminAllowlist::new(["Admin@Uni.edu "]))
    }

    #[test]
    fn test_admin_resolved_at_sign_in() {
        let identity = session();
        let admin = identity.sign_in(" ADMIN@uni.edu", "Admin", None).unwrap();
        assert!(admin.is_admin);
        assert_eq!(admin.email, "admin@uni.edu");
        assert!(identity.require_admin().is_ok());

        let student = identity.sign_in("s@uni.edu", "Student", None).unwrap();
        assert!(!student.is_admin);
        assert!(matches!(identity.require_admin(), Err(AppError::Forbidden { .. })));
    }

    #[test]
    fn test_sign_out_clears_current() {
        let identity = session();
        identity.sign_in("s@uni.edu", "Student", None).unwrap();
        identity.sign_out();
        assert!(identity.current().is_none());
        assert!(identity.require_user().is_err());
    }

    #[test]
    fn test_rejects_non_email() {
        let err = session().sign_in("nobody", "x", None).unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let identity = session();
        let mut rx = identity.subscribe();
        identity.sign_in("s@uni.edu", "Student", None).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|u| u.email.as_str()), Some("s@uni.edu"));
    }
}
