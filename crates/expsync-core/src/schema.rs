//! Schema validation
//!
//! Every aggregated metric is checked against the embedded metric schema.
//! Validation is not fail-fast: every failing metric and every individual
//! violation is collected, and the run fails once with one report covering
//! all of them.

use crate::error::{Result, SyncError};
use crate::loader::RawMetric;
use crate::model::{DeclaredSet, Metric};
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::info;

/// Versioned schema describing the metric shape and its definition kinds
pub const METRIC_SCHEMA: &str = include_str!("../schemas/metric.schema.json");

static SCHEMA_DOCUMENT: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(METRIC_SCHEMA).expect("embedded schema is valid JSON"));

static COMPILED_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&SCHEMA_DOCUMENT)
        .expect("embedded schema compiles")
});

/// Validate every metric, then deserialize the survivors into a DeclaredSet
pub fn validate_metrics(metrics: Vec<RawMetric>) -> Result<DeclaredSet> {
    let mut failures: Vec<String> = Vec::new();
    for metric in &metrics {
        if let Err(errors) = COMPILED_SCHEMA.validate(&metric.value) {
            let violations: Vec<String> = errors
                .map(|e| format!("{}: {e}", e.instance_path))
                .collect();
            failures.push(format!(
                "Schema validation failed for metric: {}. It should follow the schema \
                 defined in the schema file. Errors: {}",
                metric.id,
                violations.join("; ")
            ));
        }
    }

    if !failures.is_empty() {
        return Err(SyncError::Argument(failures.join("\n")));
    }

    let mut typed = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let parsed: Metric = serde_json::from_value(metric.value).map_err(|e| {
            SyncError::Argument(format!("Failed to deserialize metric {}: {e}", metric.id))
        })?;
        typed.push(parsed);
    }

    info!("{} metrics passed schema validation", typed.len());
    Ok(DeclaredSet::new(typed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawMetric {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        RawMetric { id, value }
    }

    fn valid_metric() -> Value {
        json!({
            "id": "avg_total_token_count",
            "displayName": "Average token count",
            "description": "Average tokens per completion.",
            "lifecycle": "Active",
            "tags": ["tokens"],
            "desiredDirection": "Decrease",
            "definition": {
                "kind": "Average",
                "value": { "eventName": "completion", "eventProperty": "total_tokens" }
            }
        })
    }

    #[test]
    fn accepts_valid_metrics_in_order() {
        let mut second = valid_metric();
        second["id"] = json!("median_total_token_count");
        second["definition"] = json!({
            "kind": "Percentile",
            "value": { "eventName": "completion", "eventProperty": "total_tokens" },
            "percentile": 50
        });

        let set = validate_metrics(vec![raw(valid_metric()), raw(second)]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.ids(),
            vec!["avg_total_token_count", "median_total_token_count"]
        );
    }

    #[test]
    fn rejects_unknown_definition_kind() {
        let mut metric = valid_metric();
        metric["definition"]["kind"] = json!("Median");

        let err = validate_metrics(vec![raw(metric)]).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("Schema validation failed for metric: avg_total_token_count"),
            "unexpected message: {message}"
        );
        assert!(message.contains("/definition"), "unexpected message: {message}");
    }

    #[test]
    fn rejects_percentile_without_percentile_value() {
        let mut metric = valid_metric();
        metric["id"] = json!("median_total_token_count");
        metric["definition"] = json!({
            "kind": "Percentile",
            "value": { "eventName": "completion", "eventProperty": "total_tokens" }
        });

        let err = validate_metrics(vec![raw(metric)]).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("Schema validation failed for metric: median_total_token_count"),
            "unexpected message: {message}"
        );
    }

    #[test]
    fn rejects_definition_without_event() {
        let mut metric = valid_metric();
        metric["definition"] = json!({ "kind": "EventCount" });

        let err = validate_metrics(vec![raw(metric)]).unwrap_err();
        assert!(err
            .to_string()
            .contains("Schema validation failed for metric: avg_total_token_count"));
    }

    #[test]
    fn reports_all_failing_metrics_in_one_error() {
        let mut first = valid_metric();
        first["definition"] = json!({ "kind": "Median" });
        let mut second = valid_metric();
        second["id"] = json!("chat_started_rate");
        second["definition"] = json!({ "kind": "EventRate" });

        let err = validate_metrics(vec![raw(first), raw(second)]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("metric: avg_total_token_count"));
        assert!(message.contains("metric: chat_started_rate"));
        assert_eq!(message.lines().count(), 2);
    }

    #[test]
    fn rejects_metric_without_id() {
        let metric = json!({
            "definition": {
                "kind": "EventCount",
                "event": { "eventName": "chat_started" }
            }
        });
        let err = validate_metrics(vec![raw(metric)]).unwrap_err();
        assert!(err.to_string().contains("Schema validation failed for metric: "));
    }
}
