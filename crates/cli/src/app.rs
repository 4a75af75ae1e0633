//! Wiring of gateway, identity, cache and session file for one command run

use crate::Cli;
use anyhow::Context;
use examvault_common::cache::{CacheRegistry, CacheSnapshot, ClientCache};
use examvault_common::config::AppConfig;
use examvault_common::identity::{AdminAllowlist, IdentityProvider, SessionIdentity, User};
use examvault_common::remote::{HttpGateway, MockGateway, RecordGateway};
use examvault_common::{Catalog, MutationCoordinator, Record};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What survives between runs. Cleared by `logout`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    cache: CacheSnapshot,
}

pub struct App {
    pub config: AppConfig,
    pub identity: Arc<SessionIdentity>,
    pub registry: Arc<CacheRegistry>,
    pub catalog: Catalog,
    pub coordinator: MutationCoordinator,
    pub json: bool,
    session_path: Option<PathBuf>,
}

impl App {
    pub async fn bootstrap(cli: &Cli, config: AppConfig) -> anyhow::Result<Self> {
        let gateway: Arc<dyn RecordGateway> = match &cli.offline {
            Some(path) => Arc::new(offline_store(path).await?),
            None => Arc::new(HttpGateway::new(&config.remote)?),
        };
        info!(gateway = gateway.name(), "Gateway ready");

        let identity = Arc::new(SessionIdentity::new(AdminAllowlist::from_config(&config.identity)));
        let registry = Arc::new(CacheRegistry::new());
        let cache = registry.init();

        let session_path = cli
            .session
            .clone()
            .or_else(|| config.session.snapshot_path.as_ref().map(PathBuf::from));
        let stored = match &session_path {
            Some(path) => read_session(path).await?,
            None => SessionFile::default(),
        };

        // The admin flag is resolved again at sign-in, never read from the file
        match (&cli.email, &stored.user) {
            (Some(email), _) => {
                let name = cli.name.as_deref().unwrap_or(email);
                identity.sign_in(email, name, None)?;
            }
            (None, Some(user)) => {
                identity.sign_in(&user.email, &user.display_name, user.photo_url.clone())?;
            }
            (None, None) => {}
        }

        restore_cache(&cache, stored, identity.current().as_ref()).await;

        let catalog = Catalog::new(gateway.clone(), cache.clone(), identity.clone());
        let coordinator = MutationCoordinator::new(gateway, cache, config.validation.clone());

        Ok(Self {
            config,
            identity,
            registry,
            catalog,
            coordinator,
            json: cli.json,
            session_path,
        })
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        self.catalog.cache()
    }

    /// Write the current user and cache to the session file, if one is configured
    pub async fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = &self.session_path else {
            return Ok(());
        };

        let session = SessionFile {
            user: self.identity.current(),
            cache: self.cache().snapshot().await,
        };
        let body = serde_json::to_string_pretty(&session)?;
        tokio::fs::write(path, body)
            .await
            .with_context(|| format!("Failed to write session file {}", path.display()))?;
        Ok(())
    }

    /// Sign out and drop everything cached
    pub async fn logout(&self) {
        self.identity.sign_out();
        self.registry.reset().await;
    }
}

async fn read_session(path: &Path) -> anyhow::Result<SessionFile> {
    match tokio::fs::read_to_string(path).await {
        Ok(body) => match serde_json::from_str(&body) {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                Ok(SessionFile::default())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionFile::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to read session file {}", path.display())),
    }
}

/// Reuse the stored cache only for the user it was filled for
async fn restore_cache(cache: &ClientCache, stored: SessionFile, current: Option<&User>) {
    let owner = stored.user.as_ref().map(User::normalized_email);
    let now = current.map(User::normalized_email);
    if owner != now {
        if owner.is_some() {
            info!(previous = ?owner, current = ?now, "Session belongs to another user, starting clean");
        }
        return;
    }
    cache.restore(stored.cache).await;
}

/// In-memory store seeded from a local export
async fn offline_store(path: &Path) -> anyhow::Result<MockGateway> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read offline table {}", path.display()))?;

    let records = if text.trim_start().starts_with('[') {
        let rows: Vec<serde_json::Value> = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a JSON array of rows", path.display()))?;
        rows.iter().map(Record::parse).collect()
    } else {
        Record::parse_legacy_table(&text)
    };

    let incomplete = records.iter().filter(|r| r.is_incomplete()).count();
    info!(path = %path.display(), records = records.len(), incomplete, "Loaded offline table");
    Ok(MockGateway::with_records(records))
}
