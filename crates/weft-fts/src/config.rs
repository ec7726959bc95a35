//! Search configuration.
//!
//! `SearchConfig` is a plain serde-deserializable struct: the hosting
//! application loads it from whatever configuration source it uses and hands
//! it to [`crate::backend::WeftSearch::open`]. Every field has a default so a
//! config of `{}` is valid.

use serde::{Deserialize, Serialize};

use crate::field::StemLanguage;

/// What to do with a record that fails validation during batch ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRecordPolicy {
    /// Skip the offending record, keep indexing the rest of the batch.
    #[default]
    Skip,
    /// Abort the whole batch: staged documents are rolled back and the
    /// prior snapshot remains current.
    Abort,
}

/// Search adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the index directory. `None` selects an in-memory index.
    pub index_path: Option<String>,

    /// Stemming language for text fields that don't declare their own.
    #[serde(default)]
    pub stemming_language: StemLanguage,

    /// Enable stopword filtering in text analyzers.
    #[serde(default = "default_true")]
    pub stopwords_enabled: bool,

    /// Custom stopwords to add to the language list.
    #[serde(default)]
    pub custom_stopwords: Vec<String>,

    /// Words to preserve even if they appear in a stopword list.
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Index writer heap size in bytes.
    #[serde(default = "default_writer_heap")]
    pub writer_heap_bytes: usize,

    /// How long to wait for the exclusive write lock before giving up.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Poll interval while waiting for the write lock.
    #[serde(default = "default_lock_poll_ms")]
    pub lock_poll_ms: u64,

    /// Default page size when a search does not specify one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Highlighted snippet length in characters.
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,

    /// Policy for malformed records during batch ingestion.
    #[serde(default)]
    pub malformed_records: MalformedRecordPolicy,

    /// Offer a spelling suggestion when a query comes back empty.
    #[serde(default)]
    pub spelling_enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_writer_heap() -> usize {
    50_000_000
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_lock_poll_ms() -> u64 {
    100
}

fn default_limit() -> usize {
    10
}

fn default_snippet_length() -> usize {
    200
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            stemming_language: StemLanguage::default(),
            stopwords_enabled: default_true(),
            custom_stopwords: Vec::new(),
            allowlist: Vec::new(),
            writer_heap_bytes: default_writer_heap(),
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_poll_ms: default_lock_poll_ms(),
            default_limit: default_limit(),
            snippet_length: default_snippet_length(),
            malformed_records: MalformedRecordPolicy::default(),
            spelling_enabled: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SearchConfig::default();
        assert!(config.index_path.is_none());
        assert!(config.stopwords_enabled);
        assert!(!config.spelling_enabled);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.lock_timeout_ms, 5_000);
        assert_eq!(config.malformed_records, MalformedRecordPolicy::Skip);
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        let json = r#"{"index_path": "/tmp/idx", "spelling_enabled": true}"#;
        let config: SearchConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.index_path.as_deref(), Some("/tmp/idx"));
        assert!(config.spelling_enabled);
        assert_eq!(config.snippet_length, 200);
    }

    #[test]
    fn test_malformed_policy_serialization() {
        let json = serde_json::to_string(&MalformedRecordPolicy::Abort).unwrap();
        assert_eq!(json, "\"abort\"");

        let policy: MalformedRecordPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, MalformedRecordPolicy::Skip);
    }

    #[test]
    fn test_config_round_trip() {
        let config = SearchConfig {
            index_path: Some("/data/search".to_string()),
            malformed_records: MalformedRecordPolicy::Abort,
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let restored: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.index_path.as_deref(), Some("/data/search"));
        assert_eq!(restored.malformed_records, MalformedRecordPolicy::Abort);
    }
}
