//! Schema-driven full-text search for Weft (Tantivy backend).
//!
//! This crate bridges a framework-agnostic search surface — declarative
//! document schemas, composable query trees, faceting, ranking — onto the
//! Tantivy inverted-index engine. The hosting application declares fields
//! and hands over loosely-typed records and query ASTs; the adapter owns
//! the mapping into the engine's term space and value-slot layout, and the
//! mapping back from native matches to rendered records.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        weft-fts                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Schema / FieldSpec / FieldValue (declarations + values)    │
//! │  CompiledSchema (term namespaces, value slots, fingerprint) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  WriteSession (single-writer ingest, replace-by-key)        │
//! │  QueryNode → NativeQuery (translation + normalization)      │
//! │  SearchExecutor (ranking, facets, pagination, spelling)     │
//! │  ResultMapper (stored payloads → ResultRecord, highlight)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  WeftSearch / SearchService (async facade)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Consistency model
//!
//! One writer at a time (exclusive lock with a bounded timeout), any
//! number of readers against the last committed snapshot. A commit is the
//! single synchronization point: it atomically republishes the snapshot
//! pointer and advances a generation counter; searches already running
//! keep their pinned snapshot to completion.
//!
//! # Example
//!
//! ```rust
//! use weft_fts::{
//!     FieldSpec, QueryNode, Record, Schema, SearchConfig, SearchOptions, WeftSearch,
//! };
//!
//! # fn main() -> weft_fts::Result<()> {
//! let schema = Schema::builder()
//!     .field(FieldSpec::text("title").boost(3.0))
//!     .field(FieldSpec::numeric("price"))
//!     .build()?;
//!
//! let service = WeftSearch::open(&SearchConfig::default(), &schema)?;
//! service.ingest(&[Record::builder("product", "1")
//!     .text("title", "red fox")
//!     .integer("price", 10)
//!     .build()])?;
//!
//! let outcome = service.search_with_cancel(
//!     &QueryNode::term("title", "fox"),
//!     &SearchOptions::default(),
//!     &Default::default(),
//! )?;
//! assert_eq!(outcome.total_matches, 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod handle;
pub mod indexer;
pub mod marshal;
pub mod query;
pub mod results;
pub mod schema;
pub mod search;
pub mod spelling;

// Re-exports
pub use backend::{SearchOutcome, SearchService, WeftSearch};
pub use config::{MalformedRecordPolicy, SearchConfig};
pub use document::Record;
pub use error::{Error, Result};
pub use field::{FieldKind, FieldSpec, FieldValue, Schema, StemLanguage};
pub use handle::{IndexHandle, IndexSnapshot};
pub use indexer::{BatchStats, WriteOptions, WriteSession};
pub use query::{translate, NativeQuery, QueryNode};
pub use results::{ResultMapper, ResultRecord};
pub use schema::{AnalyzerOptions, CompiledSchema, SchemaFingerprint};
pub use search::{
    CancelToken, DateFacetRequest, DateGap, MatchHit, MatchPage, SearchExecutor, SearchOptions,
    SortOrder,
};
