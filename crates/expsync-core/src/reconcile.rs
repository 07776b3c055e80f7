//! Reconciliation engine
//!
//! Makes the remote metric registry match the declared set through three
//! phases, entered strictly in order:
//!
//! - **Validate** (always): remote-side validation of every declared metric.
//! - **Create/update** (deploy only): full-replace upsert of every metric.
//! - **Delete** (deploy + strict only): remove remote metrics absent from
//!   the declared set. Deletion runs after the upserts, so a renamed metric
//!   briefly exists under both identifiers rather than under neither.
//!
//! Each phase fans out over the whole set with a bounded number of in-flight
//! requests, waits for the entire batch to settle, and only then inspects
//! outcomes. Nothing inside a batch fails fast: the operator gets the full
//! picture of which of N metrics failed, at the price of always issuing all
//! N requests. Per-item failures are logged individually before the
//! aggregate error is raised.

use crate::client::{ApiOutcome, MetricsClient};
use crate::config::{OperationMode, RunConfig};
use crate::error::{Result, SyncError};
use crate::model::{DeclaredSet, Metric};
use crate::policy::{self, METRIC_ID_PATTERN};
use crate::token::TokenProvider;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Diagnostic code carried by synthesized invalid-identifier outcomes
const INVALID_METRIC_CODE: &str = "InvalidMetricDefinition";

/// Drives the three reconciliation phases against one workspace
pub struct ReconciliationEngine {
    client: MetricsClient,
    config: RunConfig,
}

impl ReconciliationEngine {
    pub fn new(config: &RunConfig) -> Result<Self> {
        let client = MetricsClient::new(&config.workspace_endpoint, &config.workspace_id)?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Run every phase the configuration asks for, in order
    pub async fn reconcile(
        &self,
        tokens: &dyn TokenProvider,
        metrics: &DeclaredSet,
    ) -> Result<()> {
        let scope = self.config.token_scope();

        let token = self.acquire_token(tokens, &scope).await?;
        self.validate_metrics(&token, metrics).await?;

        if self.config.operation == OperationMode::Deploy {
            info!("Creating or updating metrics");
            let token = self.acquire_token(tokens, &scope).await?;
            self.create_or_update_metrics(&token, metrics).await?;

            if self.config.strict_sync {
                info!("Deleting remaining metrics in strict mode");
                let token = self.acquire_token(tokens, &scope).await?;
                self.delete_remaining_metrics(&token, metrics).await?;
            }

            info!("Operation completed successfully");
        }

        Ok(())
    }

    /// Phase V: remote-side validation of the whole declared set.
    ///
    /// A metric is valid iff the response status is a success and the body's
    /// `result` field says so. Any non-valid metric fails the run and later
    /// phases never execute, regardless of mode.
    pub async fn validate_metrics(&self, token: &str, metrics: &DeclaredSet) -> Result<()> {
        info!("Validating {} metrics", metrics.len());

        let token: Arc<str> = Arc::from(token);
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks = JoinSet::new();

        for metric in metrics.iter().cloned() {
            let client = self.client.clone();
            let token = Arc::clone(&token);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let outcome = if policy::is_valid_metric_id(&metric.id) {
                    client.validate_metric(&token, &metric).await
                } else {
                    Ok(invalid_id_validation_outcome(&metric.id))
                };
                (metric, outcome)
            });
        }

        let mut all_valid = true;
        while let Some(joined) = tasks.join_next().await {
            let (metric, outcome) = joined
                .map_err(|e| SyncError::Validation(format!("Validation task failed: {e}")))?;
            match outcome {
                Ok(outcome) => {
                    if !judge_validation(&metric, &outcome) {
                        all_valid = false;
                    }
                }
                Err(e) => {
                    error!("Failed to validate metric {}: {e}", metric.id);
                    all_valid = false;
                }
            }
        }

        if !all_valid {
            return Err(SyncError::Validation("Metric validation failed".into()));
        }
        Ok(())
    }

    /// Phase C: full-replace upsert of every declared metric.
    ///
    /// When commit-hash annotation is on, every submitted description is
    /// rewritten: every metric, every run, not just changed ones.
    pub async fn create_or_update_metrics(
        &self,
        token: &str,
        metrics: &DeclaredSet,
    ) -> Result<()> {
        let sha = self.config.annotation_sha().map(str::to_string);

        let token: Arc<str> = Arc::from(token);
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks = JoinSet::new();

        for metric in metrics.iter().cloned() {
            let body = if policy::is_valid_metric_id(&metric.id) {
                Some(metric.upsert_body(sha.as_deref())?)
            } else {
                None
            };
            let client = self.client.clone();
            let token = Arc::clone(&token);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let outcome = match body {
                    Some(body) => client.upsert_metric(&token, &metric.id, &body).await,
                    None => Ok(invalid_id_upsert_outcome(&metric.id)),
                };
                (metric, outcome)
            });
        }

        let mut all_updated = true;
        while let Some(joined) = tasks.join_next().await {
            let (metric, outcome) =
                joined.map_err(|e| SyncError::Validation(format!("Upsert task failed: {e}")))?;
            match outcome {
                Ok(outcome) => {
                    if !judge_upsert(&metric, &outcome) {
                        all_updated = false;
                    }
                }
                Err(e) => {
                    error!("Failed to create or update metric {}: {e}", metric.id);
                    all_updated = false;
                }
            }
        }

        if !all_updated {
            return Err(SyncError::Validation("Metric create or update failed".into()));
        }
        info!("All metrics are created or updated successfully");
        Ok(())
    }

    /// Phase D: delete every remote metric absent from the declared set.
    ///
    /// The listing fetch is fatal on failure; individual deletes are
    /// attempted independently and judged together after the batch settles.
    pub async fn delete_remaining_metrics(
        &self,
        token: &str,
        metrics: &DeclaredSet,
    ) -> Result<()> {
        let remote_ids = self.client.list_metric_ids(token).await?;
        info!("Found {} metrics", remote_ids.len());

        let declared: HashSet<&str> = metrics.ids().into_iter().collect();
        let to_delete: Vec<String> = remote_ids
            .into_iter()
            .filter(|id| !declared.contains(id.as_str()))
            .collect();
        info!("Found {} metrics that need to be deleted", to_delete.len());

        let token: Arc<str> = Arc::from(token);
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks = JoinSet::new();

        for id in to_delete {
            let client = self.client.clone();
            let token = Arc::clone(&token);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let outcome = client.delete_metric(&token, &id).await;
                (id, outcome)
            });
        }

        let mut all_deleted = true;
        while let Some(joined) = tasks.join_next().await {
            let (id, outcome) =
                joined.map_err(|e| SyncError::Validation(format!("Delete task failed: {e}")))?;
            match outcome {
                Ok(outcome) => {
                    if !judge_delete(&id, &outcome) {
                        all_deleted = false;
                    }
                }
                Err(e) => {
                    error!("Failed to delete metric {id}: {e}");
                    all_deleted = false;
                }
            }
        }

        if !all_deleted {
            return Err(SyncError::Validation("Metric deletion failed".into()));
        }
        info!("Additional metrics are deleted successfully");
        Ok(())
    }

    async fn acquire_token(&self, tokens: &dyn TokenProvider, scope: &str) -> Result<String> {
        tokens
            .acquire(scope)
            .await
            .map_err(|e| SyncError::Token(e.to_string()))
    }
}

fn judge_validation(metric: &Metric, outcome: &ApiOutcome) -> bool {
    if !outcome.is_success() {
        error!(
            "Failed to validate metric {}: Status: {}. Message: {}",
            metric.id,
            outcome.status,
            outcome.body_text()
        );
        false
    } else if outcome.validation_result() != Some("Valid") {
        error!(
            "Metric validation failed for {}: Message: {}",
            metric.id,
            outcome.body_text()
        );
        false
    } else {
        info!("Metric {} is valid", metric.id);
        true
    }
}

fn judge_upsert(metric: &Metric, outcome: &ApiOutcome) -> bool {
    if !outcome.is_success() {
        error!(
            "Failed to create or update metric {}: Status: {}. Message: {}. Error: {}",
            metric.id,
            outcome.status,
            outcome.body_text(),
            outcome.error.as_deref().unwrap_or_default()
        );
        false
    } else {
        info!("Metric {} is updated to {}", metric.id, outcome.body_text());
        true
    }
}

fn judge_delete(id: &str, outcome: &ApiOutcome) -> bool {
    if !outcome.is_success() {
        error!(
            "Failed to delete metric {id}: Status: {}.",
            outcome.status
        );
        false
    } else {
        info!("Metric {id} is deleted");
        true
    }
}

/// Validation outcome synthesized for an identifier the policy rejects; the
/// metric never reaches the network but reports like a real response.
fn invalid_id_validation_outcome(id: &str) -> ApiOutcome {
    ApiOutcome {
        status: StatusCode::OK,
        body: Some(json!({
            "result": "Invalid",
            "diagnostics": [{
                "code": INVALID_METRIC_CODE,
                "message": format!("Invalid metric id: {id}, it should match {METRIC_ID_PATTERN}"),
            }],
        })),
        error: None,
    }
}

/// Upsert outcome synthesized for an identifier the policy rejects
fn invalid_id_upsert_outcome(id: &str) -> ApiOutcome {
    ApiOutcome {
        status: StatusCode::BAD_REQUEST,
        body: None,
        error: Some(format!(
            "Invalid metric id {id}, it should match {METRIC_ID_PATTERN}"
        )),
    }
}
