//! Token acquisition
//!
//! Credential acquisition itself is an external concern; the engine only
//! needs an opaque bearer string per scope. The token is fetched once per
//! phase and shared read-only by every concurrent task in that phase.

use anyhow::{anyhow, Context};
use async_trait::async_trait;

/// Capability that exchanges a resource scope for a bearer token
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a bearer token for `scope`. Failure is fatal and untyped.
    async fn acquire(&self, scope: &str) -> anyhow::Result<String>;
}

/// Reads the token from an environment variable, the usual handoff from an
/// external credential step in CI
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    variable: String,
}

impl EnvTokenProvider {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn acquire(&self, _scope: &str) -> anyhow::Result<String> {
        let token = std::env::var(&self.variable)
            .with_context(|| format!("Environment variable {} is not set", self.variable))?;
        if token.trim().is_empty() {
            return Err(anyhow!("Environment variable {} is empty", self.variable));
        }
        Ok(token)
    }
}

/// Fixed token, for tests and pre-acquired credentials
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire(&self, _scope: &str) -> anyhow::Result<String> {
        Ok(self.token.clone())
    }
}
