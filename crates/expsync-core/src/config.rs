//! Run configuration
//!
//! Resolved once at the start of a run, immutable thereafter, and passed by
//! reference to every component.

/// Default bound on concurrent in-flight remote calls within a phase
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// What a run is allowed to do remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Remote-side validation only; nothing is written
    Validate,
    /// Validate, then create/update (and in strict mode, delete)
    Deploy,
}

/// Operating parameters for one invocation
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL of the experimentation service
    pub workspace_endpoint: String,

    /// Workspace whose metric registry is reconciled
    pub workspace_id: String,

    /// Newline-separated glob pattern selecting configuration files
    pub config_pattern: String,

    /// Validate-only or deploy
    pub operation: OperationMode,

    /// Delete remote metrics absent from the declared set
    pub strict_sync: bool,

    /// Append " Commit hash: <sha>" to every submitted description
    pub add_commit_sha_to_description: bool,

    /// Commit identifier used by the annotation; empty when annotation is off
    pub commit_sha: String,

    /// Bound on concurrent remote calls within a phase
    pub max_in_flight: usize,
}

impl RunConfig {
    /// Commit SHA to annotate with, if annotation is enabled
    pub fn annotation_sha(&self) -> Option<&str> {
        if self.add_commit_sha_to_description {
            Some(self.commit_sha.as_str())
        } else {
            None
        }
    }

    /// Token scope for the configured endpoint
    pub fn token_scope(&self) -> String {
        format!("{}/.default", self.workspace_endpoint.trim_end_matches('/'))
    }
}
