//! Identifier policy
//!
//! The remote API mishandles identifiers outside this lexical pattern, so the
//! engine guards every mutation with this predicate and synthesizes a local
//! outcome for rejected identifiers instead of sending them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lexical pattern every metric identifier must match
pub const METRIC_ID_PATTERN: &str = "^[a-z_][a-z0-9_]*$";

static METRIC_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(METRIC_ID_PATTERN).expect("metric id pattern compiles"));

/// Whether an identifier may be sent to the remote API
pub fn is_valid_metric_id(id: &str) -> bool {
    METRIC_ID_RE.is_match(id)
}
