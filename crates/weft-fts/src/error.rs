//! Error types for weft-fts.
//!
//! The taxonomy separates schema problems (fatal at compile time), per-record
//! write problems (recoverable, policy-controlled), lock contention
//! (recoverable with retry), malformed queries (fatal to that query), and
//! engine failures (fatal, propagated). Every variant carries enough context
//! to act on: the field name, the record key, or the offending value.

use thiserror::Error;

/// Result type alias for weft-fts operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in weft-fts.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from weft-core.
    #[error("Core error: {0}")]
    Core(#[from] weft_core::Error),

    /// Schema compilation failure: field collision, invalid declaration, or
    /// kind drift against a previously persisted schema fingerprint.
    #[error("schema error on field '{field}': {reason}")]
    Schema { field: String, reason: String },

    /// A record could not be indexed. Recoverable per-record: batch
    /// ingestion either skips the record or aborts the commit, depending on
    /// the configured policy.
    #[error("cannot index record '{record}'{}: {reason}", field_suffix(.field))]
    IndexWrite {
        record: String,
        field: Option<String>,
        reason: String,
    },

    /// The exclusive write lock could not be acquired within the bounded
    /// timeout. Callers retry with backoff.
    #[error("write lock not acquired after {waited_ms} ms")]
    LockTimeout { waited_ms: u64 },

    /// A query referenced a field absent from the compiled schema.
    #[error("unknown field '{0}' in query")]
    UnknownField(String),

    /// A range query was malformed: inverted bounds, wrong field kind, or
    /// bounds that do not match the field's declared representation.
    #[error("invalid range on field '{field}': {reason}")]
    InvalidRange { field: String, reason: String },

    /// A boost weight was zero or negative.
    #[error("invalid boost weight {weight}: must be > 0")]
    InvalidBoost { weight: f32 },

    /// A query node used a field in a way its kind does not support, e.g.
    /// a phrase over a numeric field or a facet filter on a text field.
    #[error("invalid query on field '{field}': {reason}")]
    InvalidQuery { field: String, reason: String },

    /// The search was cancelled through its cancellation token.
    #[error("search cancelled")]
    Cancelled,

    /// Failure inside the underlying engine. Fatal; no partial commit is
    /// ever visible.
    #[error("engine error: {0}")]
    Engine(#[from] tantivy::TantivyError),
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(f) => format!(" (field '{f}')"),
        None => String::new(),
    }
}

impl Error {
    /// Create a schema error for a named field.
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a per-record write error.
    pub fn index_write(
        record: impl Into<String>,
        field: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IndexWrite {
            record: record.into(),
            field: field.map(String::from),
            reason: reason.into(),
        }
    }

    /// Create an invalid-range error.
    pub fn invalid_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-query error.
    pub fn invalid_query(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Core(weft_core::Error::parse(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = Error::schema("price", "slot collision");
        assert_eq!(
            err.to_string(),
            "schema error on field 'price': slot collision"
        );
    }

    #[test]
    fn test_index_write_error_with_field() {
        let err = Error::index_write("product.7", Some("price"), "expected a number");
        let msg = err.to_string();
        assert!(msg.contains("product.7"));
        assert!(msg.contains("price"));
        assert!(msg.contains("expected a number"));
    }

    #[test]
    fn test_index_write_error_without_field() {
        let err = Error::index_write("product.7", None, "payload too large");
        assert!(!err.to_string().contains("field"));
    }

    #[test]
    fn test_lock_timeout_display() {
        let err = Error::LockTimeout { waited_ms: 5000 };
        assert_eq!(err.to_string(), "write lock not acquired after 5000 ms");
    }

    #[test]
    fn test_invalid_boost_display() {
        let err = Error::InvalidBoost { weight: -1.5 };
        assert!(err.to_string().contains("-1.5"));
    }

    #[test]
    fn test_unknown_field_display() {
        let err = Error::UnknownField("colour".to_string());
        assert_eq!(err.to_string(), "unknown field 'colour' in query");
    }
}
