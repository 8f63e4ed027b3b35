//! Runtime knobs for a [`SeriesGraph`](crate::graph::SeriesGraph).
use crate::error::{GraphError, GraphResult};
use serde::Deserialize;

/// What `add_node` does when the series name is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `GraphError::DuplicateNode`, leaving the graph untouched.
    #[default]
    Reject,
    /// Reuse the existing node, wire any new publishers into it and mark it
    /// stale for the current episode.
    MergePublishers,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    pub duplicate_policy: DuplicatePolicy,
    /// Keep resolved root sets between queries. Disabling it makes every
    /// `roots` call walk the ancestry again.
    pub memoize_roots: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            memoize_roots: true,
        }
    }
}

impl GraphConfig {
    /// Parses a config document such as
    /// `{"duplicate_policy": "merge_publishers", "memoize_roots": false}`.
    /// Missing fields fall back to their defaults; unknown keys are rejected.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("{}", DuplicatePolicy::Reject, true)]
    #[case(r#"{"duplicate_policy": "merge_publishers"}"#, DuplicatePolicy::MergePublishers, true)]
    #[case(r#"{"memoize_roots": false}"#, DuplicatePolicy::Reject, false)]
    #[case(
        r#"{"duplicate_policy": "reject", "memoize_roots": true}"#,
        DuplicatePolicy::Reject,
        true
    )]
    fn test_config_from_json(
        #[case] input: &str,
        #[case] policy: DuplicatePolicy,
        #[case] memoize: bool,
    ) {
        let cfg = GraphConfig::from_json(input).expect("config should parse");
        assert_eq!(cfg.duplicate_policy, policy);
        assert_eq!(cfg.memoize_roots, memoize);
    }

    #[rstest]
    #[case(r#"{"duplicate_policy": "overwrite"}"#)]
    #[case(r#"{"memoise_roots": false}"#)]
    #[case(r#"{"duplicate_policy": "reject", "extra": 1}"#)]
    fn test_config_rejects_unknown_policy(#[case] input: &str) {
        let err = GraphConfig::from_json(input).unwrap_err();
        assert!(matches!(err, GraphError::Config(_)), "Got: {:?}", err);
    }
}
