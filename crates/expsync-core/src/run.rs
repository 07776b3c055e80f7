//! Run orchestration
//!
//! One run: enumerate configuration files, aggregate and schema-gate the
//! declared set, then reconcile it against the remote registry. Everything
//! is created fresh per invocation and discarded at exit; the remote
//! registry is the only durable state.

use crate::config::RunConfig;
use crate::error::Result;
use crate::files::FileEnumerator;
use crate::model::DeclaredSet;
use crate::reconcile::ReconciliationEngine;
use crate::token::TokenProvider;
use crate::{loader, schema};
use tracing::info;

/// Aggregate and validate the declared set without touching the network
pub fn load_declared_set(
    config: &RunConfig,
    enumerator: &dyn FileEnumerator,
) -> Result<DeclaredSet> {
    info!("Loading configuration files from: {}", config.config_pattern);
    let files = enumerator.enumerate(&config.config_pattern)?;
    for file in &files {
        info!("Using configuration file: {}", file.display());
    }

    let raw = loader::aggregate(&files)?;
    schema::validate_metrics(raw)
}

/// Execute one full synchronization run
pub async fn run(
    config: &RunConfig,
    enumerator: &dyn FileEnumerator,
    tokens: &dyn TokenProvider,
) -> Result<()> {
    let metrics = load_declared_set(config, enumerator)?;
    info!("Configuration loaded");

    let engine = ReconciliationEngine::new(config)?;
    engine.reconcile(tokens, &metrics).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OperationMode, DEFAULT_MAX_IN_FLIGHT};
    use crate::files::GlobEnumerator;
    use serde_json::json;
    use std::fs;

    fn config(pattern: String) -> RunConfig {
        RunConfig {
            workspace_endpoint: "https://exp.azure.net".into(),
            workspace_id: "ws1".into(),
            config_pattern: pattern,
            operation: OperationMode::Validate,
            strict_sync: false,
            add_commit_sha_to_description: false,
            commit_sha: String::new(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    #[test]
    fn loads_a_valid_file_into_a_declared_set() {
        let dir = tempfile::tempdir().unwrap();
        let document = json!({
            "metrics": [
                {
                    "id": "avg_total_token_count",
                    "definition": {
                        "kind": "Average",
                        "value": { "eventName": "completion", "eventProperty": "total_tokens" }
                    }
                },
                {
                    "id": "median_total_token_count",
                    "definition": {
                        "kind": "Percentile",
                        "value": { "eventName": "completion", "eventProperty": "total_tokens" },
                        "percentile": 50
                    }
                }
            ]
        });
        fs::write(
            dir.path().join("metrics.json"),
            serde_json::to_string(&document).unwrap(),
        )
        .unwrap();

        let cfg = config(format!("{}/*.json", dir.path().display()));
        let set = load_declared_set(&cfg, &GlobEnumerator).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.ids(),
            vec!["avg_total_token_count", "median_total_token_count"]
        );
    }

    #[test]
    fn zero_resolved_files_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(format!("{}/missing.json", dir.path().display()));
        let err = load_declared_set(&cfg, &GlobEnumerator).unwrap_err();
        assert_eq!(err.to_string(), "No configuration files found");
    }
}
