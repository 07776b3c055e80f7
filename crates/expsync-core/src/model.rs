//! Metric data model
//!
//! A `Metric` is one declared measurable quantity with an identifier and a
//! typed definition. The `definition` field is a tagged union on `kind` with
//! one case per supported aggregation, so adding a kind is a compile-time
//! exhaustiveness change rather than a stringly-typed one.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One declared metric, as authored in configuration and submitted to the
/// remote registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Identifier, globally unique within a run. Immutable once parsed.
    pub id: String,

    /// Human-readable name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Free-form description; rewritten when commit-hash annotation is on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Lifecycle tag (e.g. "Active")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,

    /// Arbitrary grouping tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Which way this metric is supposed to move
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_direction: Option<DesiredDirection>,

    /// How the metric is computed
    pub definition: MetricDefinition,
}

/// Desired movement direction for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesiredDirection {
    Increase,
    Decrease,
    Neutral,
}

/// Metric computation, discriminated on `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum MetricDefinition {
    /// Count of occurrences of an event
    EventCount { event: ObservedEvent },

    /// Count of distinct users that emitted an event
    UserCount { event: ObservedEvent },

    /// Share of event occurrences satisfying a condition
    EventRate {
        event: ObservedEvent,
        rate_condition: String,
    },

    /// Share of users that reached `end_event` after `start_event`
    UserRate {
        start_event: ObservedEvent,
        end_event: ObservedEvent,
    },

    /// Sum of an event property
    Sum { value: AggregatedValue },

    /// Average of an event property
    Average { value: AggregatedValue },

    /// Percentile of an event property
    Percentile {
        value: AggregatedValue,
        percentile: f64,
    },
}

/// Reference to an observed event, optionally filtered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedEvent {
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Event property aggregated by Sum/Average/Percentile kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedValue {
    pub event_name: String,
    pub event_property: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Metric {
    /// Build the full-replace upsert body: the metric serialized without its
    /// identifier (the identifier travels in the URL), with the description
    /// rewritten when a commit SHA is supplied.
    ///
    /// The rewrite applies to every metric on every run, not just changed
    /// ones, because the upsert is a full replace.
    pub fn upsert_body(&self, commit_sha: Option<&str>) -> Result<Value> {
        let mut metric = self.clone();
        if let Some(sha) = commit_sha {
            let base = metric.description.unwrap_or_default();
            metric.description = Some(format!("{base} Commit hash: {sha}"));
        }

        let mut body = serde_json::to_value(&metric).map_err(|e| {
            SyncError::Argument(format!("Failed to serialize metric {}: {e}", self.id))
        })?;
        if let Some(obj) = body.as_object_mut() {
            obj.remove("id");
        }
        Ok(body)
    }
}

/// The ordered, deduplicated sequence of metrics produced by one run.
///
/// Owned exclusively by the run and never persisted; the remote registry is
/// the durable state.
#[derive(Debug, Clone, Default)]
pub struct DeclaredSet {
    metrics: Vec<Metric>,
}

impl DeclaredSet {
    /// Wrap an already-deduplicated metric sequence
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self { metrics }
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterate metrics in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Metric> {
        self.metrics.iter()
    }

    /// Identifiers in declaration order
    pub fn ids(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a DeclaredSet {
    type Item = &'a Metric;
    type IntoIter = std::slice::Iter<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}
