//! File enumeration
//!
//! Turns a newline-separated glob pattern string into an ordered list of
//! file paths. Lines are trimmed independently; a line starting with `!` is a
//! negation pattern that prunes earlier matches. An empty result is a valid
//! outcome the aggregator must detect and reject.

use crate::error::{Result, SyncError};
use glob::Pattern;
use std::path::PathBuf;
use tracing::debug;

/// Capability that expands a pattern string into file paths
pub trait FileEnumerator: Send + Sync {
    /// Expand `pattern` into an ordered list of paths
    fn enumerate(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

/// Glob-backed enumerator used by the CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobEnumerator;

impl FileEnumerator for GlobEnumerator {
    fn enumerate(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let lines: Vec<String> = pattern
            .lines()
            .map(normalize_line)
            .filter(|l| !l.is_empty())
            .collect();

        let (negations, includes): (Vec<&String>, Vec<&String>) =
            lines.iter().partition(|l| l.starts_with('!'));

        let mut files: Vec<PathBuf> = Vec::new();
        for include in includes {
            let entries = glob::glob(include).map_err(|e| {
                SyncError::Argument(format!("Invalid file pattern {include}: {e}"))
            })?;
            for entry in entries {
                match entry {
                    Ok(path) if path.is_file() => {
                        if !files.contains(&path) {
                            files.push(path);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => debug!(pattern = %include, "Skipping unreadable path: {e}"),
                }
            }
        }

        for negation in negations {
            let raw = negation.trim_start_matches('!');
            let matcher = Pattern::new(raw)
                .map_err(|e| SyncError::Argument(format!("Invalid file pattern {raw}: {e}")))?;
            files.retain(|path| !matcher.matches_path(path));
        }

        Ok(files)
    }
}

/// Trim a pattern line and collapse `! pattern` into `!pattern`
fn normalize_line(line: &str) -> String {
    let line = line.trim();
    match line.strip_prefix('!') {
        Some(rest) => format!("!{}", rest.trim_start()),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn expands_a_single_glob_line() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.json");
        let b = write(dir.path(), "b.json");
        write(dir.path(), "ignored.yaml");

        let files = GlobEnumerator
            .enumerate(&format!("{}/*.json", dir.path().display()))
            .unwrap();
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn splits_and_trims_lines() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.json");
        let b = write(dir.path(), "b.json");

        let pattern = format!(
            "  {}/a.json  \n\n   {}/b.json",
            dir.path().display(),
            dir.path().display()
        );
        let files = GlobEnumerator.enumerate(&pattern).unwrap();
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn negation_lines_prune_matches() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.json");
        write(dir.path(), "a.draft.json");

        let pattern = format!(
            "{}/*.json\n! {}/*.draft.json",
            dir.path().display(),
            dir.path().display()
        );
        let files = GlobEnumerator.enumerate(&pattern).unwrap();
        assert_eq!(files, vec![a]);
    }

    #[test]
    fn missing_files_yield_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let files = GlobEnumerator
            .enumerate(&format!("{}/missing.json", dir.path().display()))
            .unwrap();
        assert!(files.is_empty());
    }
}
