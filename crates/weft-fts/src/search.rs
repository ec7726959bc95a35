//! Query execution: ranking, pagination, facets, and cancellation.
//!
//! [`SearchExecutor::execute`] evaluates a translated query against a
//! pinned snapshot. Ranking is the engine's BM25 stream, descending score
//! with ascending doc-id tie-break; a `sort_by` option overrides relevance
//! with a value-slot comparison. Pagination is a lazy window over the
//! ranked stream — the top-`offset + limit` heap is all that materializes,
//! never the full result set.
//!
//! Facet counts aggregate over the **full** matching set, not the returned
//! page, and are gathered in the same collection pass as ranking. Date
//! facets bucket a date slot over caller-supplied gap boundaries, and
//! query facets count auxiliary queries against the same snapshot.
//!
//! Long aggregations honor a caller-supplied [`CancelToken`], checked at
//! segment boundaries, so a slow query can be abandoned without touching
//! snapshot state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use tantivy::collector::{
    Collector, Count, FacetCollector, MultiCollector, SegmentCollector, TopDocs,
};
use tantivy::columnar::Column;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery, Weight};
use tantivy::schema::IndexRecordOption;
use tantivy::{DocAddress, DocId, Order, Score, SegmentReader, TantivyError, Term};

use crate::error::{Error, Result};
use crate::field::FieldKind;
use crate::handle::{IndexHandle, IndexSnapshot};
use crate::marshal;
use crate::query::{translate, NativeQuery, QueryNode};
use crate::spelling;

/// Upper bound on date-facet buckets per field.
const MAX_DATE_BUCKETS: usize = 10_000;

/// Cooperative cancellation token.
///
/// Clone freely; all clones share one flag. The executor checks it at
/// segment boundaries during collection and between auxiliary passes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Sort direction for slot-ordered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Gap unit for date faceting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGap {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// A date-facet request: bucket matches of a date field between `start`
/// and `end` by `amount` × `gap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFacetRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub gap: DateGap,
    #[serde(default = "default_gap_amount")]
    pub amount: u32,
}

fn default_gap_amount() -> u32 {
    1
}

/// Options recognized by [`SearchExecutor::execute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Skip this many ranked results.
    #[serde(default)]
    pub offset: usize,

    /// Return at most this many results. Zero returns an empty page while
    /// still computing totals and facets.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Override relevance ranking with this field's value slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    /// Direction for `sort_by`.
    #[serde(default)]
    pub sort_order: SortOrder,

    /// Facet fields to count over the full matching set.
    #[serde(default)]
    pub facet_fields: BTreeSet<String>,

    /// Date fields to bucket-count over the full matching set.
    #[serde(default)]
    pub date_facets: BTreeMap<String, DateFacetRequest>,

    /// Named auxiliary queries whose hit counts are reported alongside.
    #[serde(default)]
    pub query_facets: BTreeMap<String, QueryNode>,

    /// Offer a spelling suggestion when the page comes back empty.
    #[serde(default)]
    pub spelling_suggestion: bool,

    /// Compute highlighted snippets when rendering results.
    #[serde(default)]
    pub highlight: bool,
}

fn default_limit() -> usize {
    10
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
            sort_by: None,
            sort_order: SortOrder::default(),
            facet_fields: BTreeSet::new(),
            date_facets: BTreeMap::new(),
            query_facets: BTreeMap::new(),
            spelling_suggestion: false,
            highlight: false,
        }
    }
}

impl SearchOptions {
    /// Options with an explicit page window.
    pub fn page(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }
}

/// One ranked match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchHit {
    /// Engine address of the document within the snapshot.
    pub address: DocAddress,
    /// Stable packed form of the address: `segment_ord << 32 | doc`.
    pub doc_id: u64,
    /// Relevance score; `0.0` when a sort override is in effect.
    pub score: f32,
}

impl MatchHit {
    fn new(address: DocAddress, score: f32) -> Self {
        let doc_id = (u64::from(address.segment_ord) << 32) | u64::from(address.doc_id);
        Self {
            address,
            doc_id,
            score,
        }
    }
}

/// The outcome of one search: the requested page plus whole-set
/// aggregates. Immutable; rendering may be repeated against it.
#[derive(Debug, Clone)]
pub struct MatchPage {
    /// The ranked page window.
    pub hits: Vec<MatchHit>,
    /// Total documents matching the query, independent of the window.
    pub total_matches: usize,
    /// Facet value counts per field, ordered by descending count then
    /// value.
    pub facet_counts: BTreeMap<String, Vec<(String, u64)>>,
    /// Date bucket counts per field, keyed by bucket start.
    pub date_facet_counts: BTreeMap<String, Vec<(DateTime<Utc>, u64)>>,
    /// Hit counts of the auxiliary query facets.
    pub query_facet_counts: BTreeMap<String, u64>,
    /// Corrected query string, present only when requested and the page
    /// was empty. Returned alongside the page, never instead of it.
    pub spelling_suggestion: Option<String>,
    /// Commit generation of the snapshot this page was computed against.
    pub generation: u64,
    pub(crate) highlight_terms: Vec<String>,
    pub(crate) highlight: bool,
}

impl MatchPage {
    /// Count for one `(field, value)` facet pair.
    pub fn facet_count(&self, field: &str, value: &str) -> u64 {
        self.facet_counts
            .get(field)
            .and_then(|counts| {
                counts
                    .iter()
                    .find(|(v, _)| v == value)
                    .map(|(_, count)| *count)
            })
            .unwrap_or(0)
    }

    /// Original query terms captured for highlighting.
    pub fn highlight_terms(&self) -> &[String] {
        &self.highlight_terms
    }
}

/// Executes translated queries against snapshots of one index.
///
/// Holds no mutable state; a single executor may serve concurrent searches
/// from multiple threads.
#[derive(Debug, Clone, Copy)]
pub struct SearchExecutor<'a> {
    handle: &'a IndexHandle,
}

impl<'a> SearchExecutor<'a> {
    /// Create an executor over an index handle.
    pub fn new(handle: &'a IndexHandle) -> Self {
        Self { handle }
    }

    /// Translate and execute in one step against the latest snapshot.
    pub fn search(&self, node: &QueryNode, options: &SearchOptions) -> Result<MatchPage> {
        let native = translate(node, self.handle.schema())?;
        let snapshot = self.handle.snapshot()?;
        self.execute(&native, &snapshot, options, &CancelToken::new())
    }

    /// Execute a translated query against a pinned snapshot.
    pub fn execute(
        &self,
        native: &NativeQuery,
        snapshot: &IndexSnapshot,
        options: &SearchOptions,
        cancel: &CancelToken,
    ) -> Result<MatchPage> {
        let schema = self.handle.schema();
        let query = native.to_query();
        let searcher = snapshot.searcher();

        // Window, count, and every facet aggregate share one pass.
        let mut multi = MultiCollector::new();
        let count_handle = multi.add_collector(Count);

        enum WindowHandle {
            Scored(tantivy::collector::FruitHandle<Vec<(Score, DocAddress)>>),
            Sorted(tantivy::collector::FruitHandle<Vec<(Option<u64>, DocAddress)>>),
            Empty,
        }

        let window_handle = if options.limit == 0 {
            WindowHandle::Empty
        } else if let Some(sort_field) = &options.sort_by {
            let compiled = schema.require_field(sort_field)?;
            if !compiled.spec.kind.is_sortable() {
                return Err(Error::invalid_query(
                    sort_field,
                    format!("cannot sort by a {} field", compiled.spec.kind.name()),
                ));
            }
            let order = match options.sort_order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            let collector = TopDocs::with_limit(options.limit)
                .and_offset(options.offset)
                .order_by_u64_field(sort_field, order);
            WindowHandle::Sorted(multi.add_collector(collector))
        } else {
            let collector = TopDocs::with_limit(options.limit)
                .and_offset(options.offset)
                .order_by_score();
            WindowHandle::Scored(multi.add_collector(collector))
        };

        let mut facet_handles = Vec::new();
        for field in &options.facet_fields {
            let compiled = schema.require_field(field)?;
            if compiled.spec.kind != FieldKind::Facet {
                return Err(Error::invalid_query(
                    field,
                    format!("cannot facet on a {} field", compiled.spec.kind.name()),
                ));
            }
            let mut collector = FacetCollector::for_field(field.as_str());
            collector.add_facet("/");
            facet_handles.push((field.clone(), multi.add_collector(collector)));
        }

        let mut date_handles = Vec::new();
        for (field, request) in &options.date_facets {
            let compiled = schema.require_field(field)?;
            if compiled.spec.kind != FieldKind::Date {
                return Err(Error::invalid_query(
                    field,
                    format!("date facets need a date field, not {}", compiled.spec.kind.name()),
                ));
            }
            let boundaries = date_boundaries(field, request)?;
            let collector = DateSlotFacetCollector {
                field: field.clone(),
                encoded_boundaries: boundaries
                    .iter()
                    .map(marshal::encode_date)
                    .collect::<Result<Vec<_>>>()?,
                encoded_end: marshal::encode_date(&request.end)?,
            };
            date_handles.push((field.clone(), boundaries, multi.add_collector(collector)));
        }

        let guarded = Cancellable {
            inner: multi,
            cancel: cancel.clone(),
        };
        let mut fruits = match searcher.search(&query, &guarded) {
            Ok(fruits) => fruits,
            Err(err) => {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                return Err(err.into());
            }
        };

        let total_matches = count_handle.extract(&mut fruits);

        let hits = match window_handle {
            WindowHandle::Empty => Vec::new(),
            WindowHandle::Scored(handle) => handle
                .extract(&mut fruits)
                .into_iter()
                .map(|(score, address)| MatchHit::new(address, score))
                .collect(),
            WindowHandle::Sorted(handle) => handle
                .extract(&mut fruits)
                .into_iter()
                .map(|(_, address)| MatchHit::new(address, 0.0))
                .collect(),
        };

        let mut facet_counts = BTreeMap::new();
        for (field, handle) in facet_handles {
            let counts = handle.extract(&mut fruits);
            let mut values: Vec<(String, u64)> = counts
                .get("/")
                .map(|(facet, count)| {
                    let path = facet.to_path_string();
                    (path.trim_start_matches('/').to_string(), count)
                })
                .collect();
            values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            facet_counts.insert(field, values);
        }

        let mut date_facet_counts = BTreeMap::new();
        for (field, boundaries, handle) in date_handles {
            let counts = handle.extract(&mut fruits);
            let buckets = boundaries.into_iter().zip(counts).collect();
            date_facet_counts.insert(field, buckets);
        }

        let mut query_facet_counts = BTreeMap::new();
        for (label, node) in &options.query_facets {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let facet_query = translate(node, schema)?;
            let count = searcher.search(&facet_query.to_query(), &Count)?;
            query_facet_counts.insert(label.clone(), count as u64);
        }

        let spelling_suggestion = if options.spelling_suggestion
            && total_matches == 0
            && !native.highlight_terms().is_empty()
        {
            let text_fields: Vec<_> = schema
                .source()
                .fields()
                .iter()
                .filter(|spec| spec.kind == FieldKind::Text && spec.indexed)
                .filter_map(|spec| schema.field(&spec.name).and_then(|c| c.term_field))
                .collect();
            spelling::suggest_phrase(searcher, &text_fields, native.highlight_terms())?
        } else {
            None
        };

        Ok(MatchPage {
            hits,
            total_matches,
            facet_counts,
            date_facet_counts,
            query_facet_counts,
            spelling_suggestion,
            generation: snapshot.generation(),
            highlight_terms: native.highlight_terms().to_vec(),
            highlight: options.highlight,
        })
    }

    /// Find documents similar to the one identified by `(doc_type, key)`,
    /// excluding the seed document itself.
    ///
    /// Returns an empty page when the seed is not in the snapshot.
    pub fn more_like_this(
        &self,
        doc_type: &str,
        key: &str,
        options: &SearchOptions,
    ) -> Result<MatchPage> {
        let schema = self.handle.schema();
        let snapshot = self.handle.snapshot()?;
        let qualified = weft_core::qualified_key(doc_type, key);
        let key_term = Term::from_field_text(schema.key_field(), &qualified);

        let seed = snapshot.searcher().search(
            &TermQuery::new(key_term.clone(), IndexRecordOption::Basic),
            &TopDocs::with_limit(1).order_by_score(),
        )?;
        let Some(&(_, address)) = seed.first() else {
            return Ok(MatchPage {
                hits: Vec::new(),
                total_matches: 0,
                facet_counts: BTreeMap::new(),
                date_facet_counts: BTreeMap::new(),
                query_facet_counts: BTreeMap::new(),
                spelling_suggestion: None,
                generation: snapshot.generation(),
                highlight_terms: Vec::new(),
                highlight: false,
            });
        };

        let similar = tantivy::query::MoreLikeThisQuery::builder()
            .with_min_doc_frequency(1)
            .with_min_term_frequency(1)
            .with_document(address);

        let query = BooleanQuery::new(vec![
            (Occur::Must, Box::new(similar) as Box<dyn Query>),
            (
                Occur::MustNot,
                Box::new(TermQuery::new(key_term, IndexRecordOption::Basic)),
            ),
        ]);

        let native = NativeQuery::from_engine_query(Box::new(query));
        self.execute(&native, &snapshot, options, &CancelToken::new())
    }
}

/// Expand a date-facet request into bucket start boundaries.
fn date_boundaries(field: &str, request: &DateFacetRequest) -> Result<Vec<DateTime<Utc>>> {
    if request.start >= request.end {
        return Err(Error::invalid_range(field, "facet start must precede end"));
    }
    if request.amount == 0 {
        return Err(Error::invalid_range(field, "facet gap amount must be > 0"));
    }

    let mut boundaries = Vec::new();
    let mut cursor = request.start;
    while cursor < request.end {
        boundaries.push(cursor);
        if boundaries.len() > MAX_DATE_BUCKETS {
            return Err(Error::invalid_range(
                field,
                format!("more than {MAX_DATE_BUCKETS} facet buckets"),
            ));
        }
        cursor = match advance_date(cursor, request.gap, request.amount) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(boundaries)
}

fn advance_date(date: DateTime<Utc>, gap: DateGap, amount: u32) -> Option<DateTime<Utc>> {
    match gap {
        DateGap::Year => date.checked_add_months(Months::new(12 * amount)),
        DateGap::Month => date.checked_add_months(Months::new(amount)),
        DateGap::Day => date.checked_add_signed(chrono::Duration::days(i64::from(amount))),
        DateGap::Hour => date.checked_add_signed(chrono::Duration::hours(i64::from(amount))),
        DateGap::Minute => date.checked_add_signed(chrono::Duration::minutes(i64::from(amount))),
        DateGap::Second => date.checked_add_signed(chrono::Duration::seconds(i64::from(amount))),
    }
}

// ============================================================================
// Cancellation wrapper
// ============================================================================

/// Delegating collector that aborts at segment boundaries once its token
/// is cancelled.
struct Cancellable<C: Collector> {
    inner: C,
    cancel: CancelToken,
}

impl<C: Collector> Collector for Cancellable<C> {
    type Fruit = C::Fruit;
    type Child = C::Child;

    fn for_segment(
        &self,
        segment_local_id: u32,
        segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        self.inner.for_segment(segment_local_id, segment)
    }

    fn requires_scoring(&self) -> bool {
        self.inner.requires_scoring()
    }

    fn merge_fruits(
        &self,
        segment_fruits: Vec<<Self::Child as SegmentCollector>::Fruit>,
    ) -> tantivy::Result<Self::Fruit> {
        self.inner.merge_fruits(segment_fruits)
    }

    fn collect_segment(
        &self,
        weight: &dyn Weight,
        segment_ord: u32,
        reader: &SegmentReader,
    ) -> tantivy::Result<<Self::Child as SegmentCollector>::Fruit> {
        if self.cancel.is_cancelled() {
            return Err(TantivyError::SystemError("search cancelled".to_string()));
        }
        self.inner.collect_segment(weight, segment_ord, reader)
    }
}

// ============================================================================
// Date-slot facet collector
// ============================================================================

/// Counts matching documents into date buckets by reading the field's
/// value slot, in the same pass as ranking.
struct DateSlotFacetCollector {
    field: String,
    encoded_boundaries: Vec<u64>,
    encoded_end: u64,
}

impl Collector for DateSlotFacetCollector {
    type Fruit = Vec<u64>;
    type Child = DateSlotSegmentCollector;

    fn for_segment(
        &self,
        _segment_local_id: u32,
        segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        let column = segment.fast_fields().u64(&self.field)?;
        Ok(DateSlotSegmentCollector {
            column,
            boundaries: self.encoded_boundaries.clone(),
            end: self.encoded_end,
            counts: vec![0; self.encoded_boundaries.len()],
        })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(&self, segment_fruits: Vec<Vec<u64>>) -> tantivy::Result<Vec<u64>> {
        let mut merged = vec![0u64; self.encoded_boundaries.len()];
        for counts in segment_fruits {
            for (slot, count) in merged.iter_mut().zip(counts) {
                *slot += count;
            }
        }
        Ok(merged)
    }
}

struct DateSlotSegmentCollector {
    column: Column<u64>,
    boundaries: Vec<u64>,
    end: u64,
    counts: Vec<u64>,
}

impl SegmentCollector for DateSlotSegmentCollector {
    type Fruit = Vec<u64>;

    fn collect(&mut self, doc: DocId, _score: Score) {
        let Some(value) = self.column.first(doc) else {
            return;
        };
        if value >= self.end {
            return;
        }
        // First boundary at or below the value.
        let bucket = self.boundaries.partition_point(|b| *b <= value);
        if bucket > 0 {
            self.counts[bucket - 1] += 1;
        }
    }

    fn harvest(self) -> Vec<u64> {
        self.counts
    }
}

// ============================================================================
// Tests
// ============================================================================
