//! expsync-core - Declarative metric-definition synchronization
//!
//! This crate aggregates metric definitions authored as JSON configuration,
//! validates them against the metric schema, and reconciles the declared set
//! against a remote experimentation workspace's metric registry:
//!
//! - **loader**: flattens all configuration sources into one conflict-free
//!   declared sequence
//! - **schema**: gates the sequence against the embedded metric schema,
//!   reporting every violation at once
//! - **reconcile**: validate / create-or-update / delete phases, each a
//!   bounded concurrent fan-out with aggregate (not fail-fast) judgment
//!
//! Credential acquisition and file enumeration are capability traits
//! ([`token::TokenProvider`], [`files::FileEnumerator`]) so callers can
//! substitute their own.

pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod loader;
pub mod model;
pub mod policy;
pub mod reconcile;
pub mod run;
pub mod schema;
pub mod token;

// Re-exports
pub use client::MetricsClient;
pub use config::{OperationMode, RunConfig, DEFAULT_MAX_IN_FLIGHT};
pub use error::{Result, SyncError};
pub use files::{FileEnumerator, GlobEnumerator};
pub use model::{DeclaredSet, Metric, MetricDefinition};
pub use reconcile::ReconciliationEngine;
pub use run::run;
pub use token::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
