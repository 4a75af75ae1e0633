//! HTTP client for the spreadsheet-backed record store

use super::wire::{self, CheckRequest, DeleteRequest, Envelope, SaveRequest, UpdateStatusRequest};
use super::{ExistenceCheck, ExistenceKey, FilterOptions, ListScope, RecordGateway};
use crate::config::RemoteConfig;
use crate::errors::{AppError, Result};
use crate::metrics::GatewayCall;
use crate::models::{Record, Status};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Gateway that talks JSON to a single store endpoint.
///
/// Requests are never retried here; a `Network` error goes back to the caller,
/// which decides whether to offer a retry.
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGateway {
    /// Create a gateway from configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Self::with_timeout(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, action: &'static str, query: &[(&'static str, String)]) -> Result<Envelope> {
        let call = GatewayCall::start(action);
        let result = Self::send(self.client.get(&self.endpoint).query(query)).await;
        Self::finish(call, action, result)
    }

    async fn post<T: Serialize + Sync>(&self, action: &'static str, body: &T) -> Result<Envelope> {
        let call = GatewayCall::start(action);
        let result = Self::send(self.client.post(&self.endpoint).json(body)).await;
        Self::finish(call, action, result)
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<Envelope> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The store answered, so this is a rejection rather than a transport failure
            let message = Envelope::parse(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("store answered HTTP {}", status.as_u16()));
            return Err(AppError::Application { message: Some(message) });
        }

        Envelope::parse(&body)?.accept()
    }

    fn finish(call: GatewayCall, action: &'static str, result: Result<Envelope>) -> Result<Envelope> {
        match &result {
            Ok(_) => call.finish("success"),
            Err(e) if e.is_network() => {
                warn!(action, error = %e, "Remote store unreachable");
                call.finish("network");
            }
            Err(e) => {
                warn!(action, error = %e, "Remote store rejected request");
                call.finish("rejected");
            }
        }
        result
    }
}

#[async_trait]
impl RecordGateway for HttpGateway {
    async fn list(&self, scope: &ListScope) -> Result<Vec<Record>> {
        let envelope = self.get("list", &wire::list_query(scope)).await?;
        let records = envelope.records();
        debug!(
            count = records.len(),
            admin = scope.as_admin,
            year = ?scope.year,
            semester = ?scope.semester,
            "Listed records"
        );
        Ok(records)
    }

    async fn filter_options(&self) -> Result<FilterOptions> {
        let envelope = self
            .get("getFilters", &[("action", "getFilters".to_string())])
            .await?;
        envelope.options.ok_or_else(|| AppError::MalformedResponse {
            message: "getFilters response has no options".to_string(),
        })
    }

    async fn check_exists(&self, key: &ExistenceKey) -> Result<ExistenceCheck> {
        let envelope = self.post("check", &CheckRequest::new(key)).await?;
        if !envelope.is_exists() {
            return Ok(ExistenceCheck::default());
        }

        let mut conflicting = envelope.conflicting_branches();
        if conflicting.is_empty() {
            // Store said "exists" without naming branches: treat every requested branch as taken
            conflicting = key.branches.clone();
        }
        Ok(ExistenceCheck {
            exists: true,
            conflicting_branches: conflicting,
        })
    }

    async fn save(&self, record: &Record) -> Result<String> {
        let envelope = self.post("save", &SaveRequest::new(record)).await?;
        if envelope.is_exists() {
            return Err(AppError::Conflict {
                branches: vec![record.branch.clone()],
            });
        }

        let id = envelope.echoed_id().unwrap_or_else(|| record.id.clone());
        info!(id = %id, branch = %record.branch, "Record saved");
        Ok(id)
    }

    async fn update_status(&self, id: &str, status: Status) -> Result<()> {
        self.post("updateStatus", &UpdateStatusRequest::new(id, status))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.post("deleteRow", &DeleteRequest::new(id)).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
