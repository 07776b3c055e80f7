//! expsync - sync declared metric definitions to an experimentation workspace
//!
//! One invocation is one run: aggregate the configuration files selected by
//! `--path`, validate them locally and remotely, and (in deploy mode) make
//! the workspace's metric registry match. Exits 0 on success; on failure the
//! first unrecovered error's message is printed and the exit code is
//! non-zero.

use clap::{ArgAction, Parser, ValueEnum};
use expsync_core::{
    EnvTokenProvider, GlobEnumerator, OperationMode, RunConfig, SyncError,
    DEFAULT_MAX_IN_FLIGHT,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Metric-definition sync CLI
#[derive(Parser)]
#[command(name = "expsync")]
#[command(about = "Sync declared metric definitions to an experimentation workspace")]
#[command(version)]
struct Cli {
    /// Newline-separated glob pattern selecting metric configuration files
    /// (lines starting with '!' are exclusions)
    #[arg(short, long, env = "EXPSYNC_PATH")]
    path: String,

    /// Base URL of the experimentation service
    #[arg(long, env = "EXPSYNC_WORKSPACE_ENDPOINT")]
    workspace_endpoint: String,

    /// Workspace whose metric registry is reconciled
    #[arg(long, env = "EXPSYNC_WORKSPACE_ID")]
    workspace_id: String,

    /// What the run is allowed to do remotely
    #[arg(long, value_enum, default_value_t = Operation::Deploy)]
    operation: Operation,

    /// Delete remote metrics absent from the declared set (deploy mode only)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    strict: bool,

    /// Append " Commit hash: <sha>" to every submitted metric description
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    add_commit_hash_to_description: bool,

    /// Commit identifier used by the description annotation
    #[arg(long, env = "GITHUB_SHA")]
    commit_sha: Option<String>,

    /// Environment variable holding the bearer token
    #[arg(long, default_value = "EXPSYNC_TOKEN")]
    token_env: String,

    /// Bound on concurrent remote calls within a phase
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    max_in_flight: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Operation mode argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// Remote-side validation only; nothing is written
    Validate,
    /// Validate, then create/update (and in strict mode, delete)
    Deploy,
}

impl From<Operation> for OperationMode {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Validate => OperationMode::Validate,
            Operation::Deploy => OperationMode::Deploy,
        }
    }
}

fn build_config(cli: &Cli) -> Result<RunConfig, SyncError> {
    let commit_sha = if cli.add_commit_hash_to_description {
        match cli.commit_sha.as_deref() {
            Some(sha) if !sha.is_empty() => sha.to_string(),
            _ => {
                return Err(SyncError::Argument(
                    "Run environment is missing GITHUB_SHA variable".into(),
                ))
            }
        }
    } else {
        String::new()
    };

    Ok(RunConfig {
        workspace_endpoint: cli.workspace_endpoint.clone(),
        workspace_id: cli.workspace_id.clone(),
        config_pattern: cli.path.clone(),
        operation: cli.operation.into(),
        strict_sync: cli.strict,
        add_commit_sha_to_description: cli.add_commit_hash_to_description,
        commit_sha,
        max_in_flight: cli.max_in_flight,
    })
}

async fn run(cli: Cli) -> Result<(), SyncError> {
    let config = build_config(&cli)?;
    let tokens = EnvTokenProvider::new(&cli.token_env);
    expsync_core::run(&config, &GlobEnumerator, &tokens).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
