//! Search service facade.
//!
//! [`WeftSearch`] wires the pieces together behind one handle: open the
//! index from a [`SearchConfig`] and a declarative [`Schema`], ingest
//! records through write sessions, and run queries that come back fully
//! rendered. The [`SearchService`] trait is the seam the hosting
//! application programs against; the async surface keeps it compatible
//! with async hosts even though the engine itself is synchronous.
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_fts::{QueryNode, Schema, SearchConfig, SearchService, WeftSearch};
//!
//! let service = WeftSearch::open(&config, &schema)?;
//! service.ingest(&records)?;
//!
//! let outcome = service
//!     .search(&QueryNode::term("title", "fox"), &Default::default())
//!     .await?;
//! for record in &outcome.records {
//!     println!("{}: {:.2}", record.primary_key, record.score);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::document::Record;
use crate::error::Result;
use crate::field::Schema;
use crate::handle::IndexHandle;
use crate::indexer::{BatchStats, WriteOptions, WriteSession};
use crate::query::QueryNode;
use crate::results::{ResultMapper, ResultRecord};
use crate::schema::{AnalyzerOptions, CompiledSchema};
use crate::search::{CancelToken, SearchExecutor, SearchOptions};

/// A fully rendered search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Rendered records for the requested page.
    pub records: Vec<ResultRecord>,
    /// Total documents matching, independent of the page window.
    pub total_matches: usize,
    /// Facet value counts per field.
    pub facet_counts: BTreeMap<String, Vec<(String, u64)>>,
    /// Date bucket counts per field.
    pub date_facet_counts: BTreeMap<String, Vec<(DateTime<Utc>, u64)>>,
    /// Auxiliary query facet counts.
    pub query_facet_counts: BTreeMap<String, u64>,
    /// Spelling suggestion, when requested and the page was empty.
    pub spelling_suggestion: Option<String>,
    /// Snapshot generation the response was computed against.
    pub generation: u64,
}

/// Abstract search service.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Execute a query and render the results.
    async fn search(&self, query: &QueryNode, options: &SearchOptions) -> Result<SearchOutcome>;

    /// Backend name, for diagnostics.
    fn name(&self) -> &str;

    /// Whether the service is ready to answer queries.
    fn is_ready(&self) -> bool {
        true
    }
}

/// The Tantivy-backed search service.
pub struct WeftSearch {
    handle: IndexHandle,
    config: SearchConfig,
}

impl WeftSearch {
    /// Open (or create) the index described by the configuration.
    pub fn open(config: &SearchConfig, schema: &Schema) -> Result<Self> {
        let compiled = CompiledSchema::compile_with(schema, AnalyzerOptions::from(config))?;
        let handle = match &config.index_path {
            Some(path) => IndexHandle::open_or_create(Path::new(path), compiled)?,
            None => IndexHandle::create_in_ram(compiled)?,
        };
        Ok(Self {
            handle,
            config: config.clone(),
        })
    }

    /// The underlying index handle.
    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }

    /// Open a write session with the configured options.
    pub fn writer(&self) -> Result<WriteSession<'_>> {
        WriteSession::open(&self.handle, WriteOptions::from(&self.config))
    }

    /// Ingest a batch of records and commit.
    ///
    /// Applies the configured malformed-record policy; the commit makes
    /// the whole batch visible atomically.
    pub fn ingest(&self, records: &[Record]) -> Result<BatchStats> {
        let mut session = self.writer()?;
        let stats = session.index_all(records)?;
        session.commit()?;
        Ok(stats)
    }

    /// Remove one document by key, committing immediately.
    pub fn delete(&self, doc_type: &str, key: &str) -> Result<()> {
        let mut session = self.writer()?;
        session.remove(doc_type, key)?;
        session.commit()?;
        Ok(())
    }

    /// Number of documents in the latest snapshot.
    pub fn doc_count(&self) -> Result<u64> {
        Ok(self.handle.snapshot()?.doc_count())
    }

    /// Synchronous search with an explicit cancellation token.
    pub fn search_with_cancel(
        &self,
        query: &QueryNode,
        options: &SearchOptions,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome> {
        let executor = SearchExecutor::new(&self.handle);
        let native = crate::query::translate(query, self.handle.schema())?;
        let snapshot = self.handle.snapshot()?;
        let page = executor.execute(&native, &snapshot, options, cancel)?;
        self.render(&snapshot, page)
    }

    /// Documents similar to the identified one, rendered.
    pub fn more_like_this(
        &self,
        doc_type: &str,
        key: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let executor = SearchExecutor::new(&self.handle);
        let snapshot = self.handle.snapshot()?;
        let page = executor.more_like_this(doc_type, key, options)?;
        self.render(&snapshot, page)
    }

    fn render(
        &self,
        snapshot: &crate::handle::IndexSnapshot,
        page: crate::search::MatchPage,
    ) -> Result<SearchOutcome> {
        let mapper =
            ResultMapper::new(self.handle.schema()).with_snippet_length(self.config.snippet_length);
        let records = mapper
            .render(snapshot, &page)
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchOutcome {
            records,
            total_matches: page.total_matches,
            facet_counts: page.facet_counts,
            date_facet_counts: page.date_facet_counts,
            query_facet_counts: page.query_facet_counts,
            spelling_suggestion: page.spelling_suggestion,
            generation: page.generation,
        })
    }
}

#[async_trait]
impl SearchService for WeftSearch {
    async fn search(&self, query: &QueryNode, options: &SearchOptions) -> Result<SearchOutcome> {
        let mut options = options.clone();
        if options.spelling_suggestion && !self.config.spelling_enabled {
            options.spelling_suggestion = false;
        }
        self.search_with_cancel(query, &options, &CancelToken::new())
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}

impl std::fmt::Debug for WeftSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeftSearch")
            .field("index_path", &self.config.index_path)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;

    fn schema() -> Schema {
        Schema::builder()
            .field(FieldSpec::text("title"))
            .field(FieldSpec::numeric("price"))
            .field(FieldSpec::facet("category"))
            .build()
            .unwrap()
    }

    fn records() -> Vec<Record> {
        vec![
            Record::builder("product", "1")
                .text("title", "red fox")
                .integer("price", 10)
                .text("category", "toys")
                .build(),
            Record::builder("product", "2")
                .text("title", "red dog")
                .integer("price", 20)
                .text("category", "pets")
                .build(),
        ]
    }

    #[test]
    fn test_open_in_memory_and_ingest() {
        let service = WeftSearch::open(&SearchConfig::default(), &schema()).unwrap();
        let stats = service.ingest(&records()).unwrap();

        assert_eq!(stats.indexed, 2);
        assert_eq!(service.doc_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_async_search_renders_records() {
        let service = WeftSearch::open(&SearchConfig::default(), &schema()).unwrap();
        service.ingest(&records()).unwrap();

        let outcome = service
            .search(&QueryNode::term("title", "red"), &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.total_matches, 2);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].doc_type, "product");
    }

    #[tokio::test]
    async fn test_spelling_gated_by_config() {
        let service = WeftSearch::open(&SearchConfig::default(), &schema()).unwrap();
        service.ingest(&records()).unwrap();

        // spelling_enabled defaults to false, so the request flag is
        // ignored.
        let outcome = service
            .search(
                &QueryNode::term("title", "fxo"),
                &SearchOptions {
                    spelling_suggestion: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.spelling_suggestion.is_none());

        let enabled = SearchConfig {
            spelling_enabled: true,
            ..Default::default()
        };
        let service = WeftSearch::open(&enabled, &schema()).unwrap();
        service.ingest(&records()).unwrap();
        let outcome = service
            .search(
                &QueryNode::term("title", "fxo"),
                &SearchOptions {
                    spelling_suggestion: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.spelling_suggestion.as_deref(), Some("fox"));
    }

    #[test]
    fn test_delete_by_key() {
        let service = WeftSearch::open(&SearchConfig::default(), &schema()).unwrap();
        service.ingest(&records()).unwrap();

        service.delete("product", "1").unwrap();
        assert_eq!(service.doc_count().unwrap(), 1);
    }

    #[test]
    fn test_on_disk_service_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = SearchConfig {
            index_path: Some(dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        };

        {
            let service = WeftSearch::open(&config, &schema()).unwrap();
            service.ingest(&records()).unwrap();
        }

        let service = WeftSearch::open(&config, &schema()).unwrap();
        assert_eq!(service.doc_count().unwrap(), 2);
        assert_eq!(service.name(), "tantivy");
        assert!(service.is_ready());
    }
}
