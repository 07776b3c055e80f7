//! Configuration aggregation
//!
//! Reads an ordered list of configuration files, parses each into a document
//! with a `metrics` array, and flattens everything into one sequence in file
//! order then in-file order. Duplicate identifiers across *all* sources fail
//! the run before schema validation is attempted.

use crate::error::{Result, SyncError};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// One metric as authored: its identifier (empty when missing, which the
/// schema gate later rejects) and the raw document
#[derive(Debug, Clone)]
pub struct RawMetric {
    pub id: String,
    pub value: Value,
}

/// Flatten all declared metrics from `files` into one duplicate-free sequence
pub fn aggregate(files: &[PathBuf]) -> Result<Vec<RawMetric>> {
    if files.is_empty() {
        return Err(SyncError::Argument("No configuration files found".into()));
    }

    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        info!("Parsing : {}", file.display());
        documents.push(parse_config_file(file)?);
    }

    info!("Merging loaded configuration");
    let mut metrics = Vec::new();
    for document in documents {
        let declared = document
            .get("metrics")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for value in declared {
            let id = value
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            metrics.push(RawMetric { id, value });
        }
    }

    reject_duplicates(&metrics)?;

    info!("Found {} metrics in configuration files", metrics.len());
    Ok(metrics)
}

fn parse_config_file(file: &Path) -> Result<Value> {
    let parse = || -> Option<Value> {
        let data = fs::read_to_string(file).ok()?;
        serde_json::from_str(&data).ok()
    };
    parse().ok_or_else(|| SyncError::Parse(format!("Failed to parse: {}", file.display())))
}

/// Every duplicated identifier occurrence is listed, not deduplicated, so the
/// message shows how many times each identifier was declared.
fn reject_duplicates(metrics: &[RawMetric]) -> Result<()> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for metric in metrics {
        *counts.entry(metric.id.as_str()).or_default() += 1;
    }

    let duplicates: Vec<&str> = metrics
        .iter()
        .map(|m| m.id.as_str())
        .filter(|id| counts[id] > 1)
        .collect();

    if !duplicates.is_empty() {
        let message = format!(
            "Metric is defined multiple times which is not allowed: {}",
            duplicates.join(", ")
        );
        error!("{message}");
        return Err(SyncError::Argument(message));
    }
    Ok(())
}
