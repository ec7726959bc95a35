//! Abstract query trees and their translation to engine queries.
//!
//! The adapter never parses free-text query syntax; the hosting application
//! hands it a composable [`QueryNode`] tree. Translation resolves field
//! names through the compiled schema, analyzes term text with the same
//! pipeline used at indexing time, and maps the tree structurally onto the
//! engine's boolean combinators.
//!
//! Two policies are explicit rather than left to engine defaults:
//!
//! - an empty `And` translates to a match-nothing sentinel and an empty
//!   `Or` to match-everything, so degenerate trees keep a defined meaning;
//! - facet filters are hoisted out of the scored tree and applied as
//!   zero-weight conjuncts during execution, so narrowing by facet never
//!   changes relevance ranking of the remaining results.
//!
//! Trees are normalized before translation — same-kind `And`/`Or` nests
//! are flattened and double negation is eliminated — which bounds the
//! depth of the engine query and trims execution cost.

use std::ops::Bound;

use serde::{Deserialize, Serialize};
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, EmptyQuery, Occur, PhraseQuery, Query, QueryClone,
    RangeQuery, TermQuery,
};
use tantivy::schema::{Facet, IndexRecordOption};
use tantivy::Term;

use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldValue};
use crate::marshal;
use crate::schema::{CompiledField, CompiledSchema};

/// A node in the abstract query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryNode {
    /// Match documents containing `text` in `field`.
    Term { field: String, text: String },
    /// Match documents containing the terms adjacently, in order.
    Phrase { field: String, terms: Vec<String> },
    /// All children must match. Empty means match nothing.
    And { children: Vec<QueryNode> },
    /// Any child may match. Empty means match everything.
    Or { children: Vec<QueryNode> },
    /// Invert the child's matches.
    Not { child: Box<QueryNode> },
    /// Match slot values between the bounds.
    Range {
        field: String,
        lo: Option<FieldValue>,
        hi: Option<FieldValue>,
        lo_inclusive: bool,
        hi_inclusive: bool,
    },
    /// Scale the child's score contribution by `weight`.
    Boost { child: Box<QueryNode>, weight: f32 },
    /// Narrow results to one facet value without affecting ranking.
    FacetFilter { field: String, value: String },
}

impl QueryNode {
    /// A term query.
    pub fn term(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            text: text.into(),
        }
    }

    /// A phrase query over ordered terms.
    pub fn phrase<I, S>(field: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Phrase {
            field: field.into(),
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// A conjunction.
    pub fn and(children: Vec<QueryNode>) -> Self {
        Self::And { children }
    }

    /// A disjunction.
    pub fn or(children: Vec<QueryNode>) -> Self {
        Self::Or { children }
    }

    /// A negation.
    pub fn not(child: QueryNode) -> Self {
        Self::Not {
            child: Box::new(child),
        }
    }

    /// A range over a numeric or date field.
    pub fn range(
        field: impl Into<String>,
        lo: Option<FieldValue>,
        hi: Option<FieldValue>,
        lo_inclusive: bool,
        hi_inclusive: bool,
    ) -> Self {
        Self::Range {
            field: field.into(),
            lo,
            hi,
            lo_inclusive,
            hi_inclusive,
        }
    }

    /// A boosted subtree.
    pub fn boost(child: QueryNode, weight: f32) -> Self {
        Self::Boost {
            child: Box::new(child),
            weight,
        }
    }

    /// A facet post-filter.
    pub fn facet(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::FacetFilter {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Match everything (an empty disjunction).
    pub fn all() -> Self {
        Self::Or { children: vec![] }
    }

    /// Flatten same-kind nesting and eliminate double negation.
    ///
    /// `And[a, And[b, c]]` becomes `And[a, b, c]`, single-child `And`/`Or`
    /// collapse to the child, and `Not(Not(x))` becomes `x`. Empty `And`
    /// and `Or` are kept — they are the explicit sentinels.
    pub fn normalize(self) -> QueryNode {
        match self {
            QueryNode::And { children } => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.normalize() {
                        QueryNode::And { children: nested } => flat.extend(nested),
                        other => flat.push(other),
                    }
                }
                if flat.len() == 1 {
                    flat.remove(0)
                } else {
                    QueryNode::And { children: flat }
                }
            }
            QueryNode::Or { children } => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.normalize() {
                        QueryNode::Or { children: nested } => flat.extend(nested),
                        other => flat.push(other),
                    }
                }
                if flat.len() == 1 {
                    flat.remove(0)
                } else {
                    QueryNode::Or { children: flat }
                }
            }
            QueryNode::Not { child } => match child.normalize() {
                QueryNode::Not { child: inner } => *inner,
                other => QueryNode::Not {
                    child: Box::new(other),
                },
            },
            QueryNode::Boost { child, weight } => QueryNode::Boost {
                child: Box::new(child.normalize()),
                weight,
            },
            leaf => leaf,
        }
    }
}

/// A translated query, ready for execution.
///
/// The scored tree drives relevance ranking; facet filters ride alongside
/// and are conjoined with zero weight at execution time.
pub struct NativeQuery {
    scored: Box<dyn Query>,
    filters: Vec<Box<dyn Query>>,
    highlight_terms: Vec<String>,
}

impl NativeQuery {
    /// Wrap an already-assembled engine query, with no post-filters or
    /// highlight terms. Used for engine-generated queries such as
    /// more-like-this expansion.
    pub(crate) fn from_engine_query(query: Box<dyn Query>) -> Self {
        Self {
            scored: query,
            filters: Vec::new(),
            highlight_terms: Vec::new(),
        }
    }

    /// The scored engine query, without post-filters.
    pub fn scored(&self) -> &dyn Query {
        self.scored.as_ref()
    }

    /// Original (unstemmed) query terms, for highlighting.
    pub fn highlight_terms(&self) -> &[String] {
        &self.highlight_terms
    }

    /// Whether any facet post-filters are attached.
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Assemble the executable query: scored tree plus zero-weight facet
    /// conjuncts, so filtering narrows the match set without perturbing
    /// scores.
    pub fn to_query(&self) -> Box<dyn Query> {
        if self.filters.is_empty() {
            return self.scored.box_clone();
        }
        let mut clauses: Vec<(Occur, Box<dyn Query>)> =
            vec![(Occur::Must, self.scored.box_clone())];
        for filter in &self.filters {
            clauses.push((
                Occur::Must,
                Box::new(BoostQuery::new(filter.box_clone(), 0.0)),
            ));
        }
        Box::new(BooleanQuery::new(clauses))
    }
}

impl std::fmt::Debug for NativeQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeQuery")
            .field("filters", &self.filters.len())
            .field("highlight_terms", &self.highlight_terms)
            .finish()
    }
}

/// Translate an abstract query tree against a compiled schema.
///
/// # Errors
///
/// - [`Error::UnknownField`] for a field absent from the schema;
/// - [`Error::InvalidRange`] for ranges on non-sortable fields or with
///   inverted bounds;
/// - [`Error::InvalidBoost`] for boost weights ≤ 0;
/// - [`Error::InvalidQuery`] for kind misuse (phrase on a numeric field,
///   facet filter on a non-facet field, facet filters outside the
///   top-level conjunction).
pub fn translate(node: &QueryNode, schema: &CompiledSchema) -> Result<NativeQuery> {
    let normalized = node.clone().normalize();
    let mut translator = Translator {
        schema,
        highlight_terms: Vec::new(),
    };

    let mut filters = Vec::new();
    let scored = match normalized {
        QueryNode::FacetFilter { field, value } => {
            filters.push(translator.facet_filter(&field, &value)?);
            Box::new(AllQuery) as Box<dyn Query>
        }
        QueryNode::And { children } => {
            let mut scored_children = Vec::new();
            for child in children {
                match child {
                    QueryNode::FacetFilter { field, value } => {
                        filters.push(translator.facet_filter(&field, &value)?);
                    }
                    other => scored_children.push(other),
                }
            }
            if scored_children.is_empty() && !filters.is_empty() {
                Box::new(AllQuery) as Box<dyn Query>
            } else {
                translator.node(&QueryNode::And {
                    children: scored_children,
                })?
            }
        }
        other => translator.node(&other)?,
    };

    Ok(NativeQuery {
        scored,
        filters,
        highlight_terms: translator.highlight_terms,
    })
}

struct Translator<'a> {
    schema: &'a CompiledSchema,
    highlight_terms: Vec<String>,
}

impl Translator<'_> {
    fn node(&mut self, node: &QueryNode) -> Result<Box<dyn Query>> {
        match node {
            QueryNode::Term { field, text } => self.term(field, text),
            QueryNode::Phrase { field, terms } => self.phrase(field, terms),
            QueryNode::And { children } => {
                if children.is_empty() {
                    // Explicit match-nothing sentinel.
                    return Ok(Box::new(EmptyQuery));
                }
                let clauses = children
                    .iter()
                    .map(|c| Ok((Occur::Must, self.node(c)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(BooleanQuery::new(clauses)))
            }
            QueryNode::Or { children } => {
                if children.is_empty() {
                    // Explicit match-everything sentinel.
                    return Ok(Box::new(AllQuery));
                }
                let clauses = children
                    .iter()
                    .map(|c| Ok((Occur::Should, self.node(c)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(BooleanQuery::new(clauses)))
            }
            QueryNode::Not { child } => {
                let inner = self.node(child)?;
                Ok(Box::new(BooleanQuery::new(vec![
                    (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                    (Occur::MustNot, inner),
                ])))
            }
            QueryNode::Range {
                field,
                lo,
                hi,
                lo_inclusive,
                hi_inclusive,
            } => self.range(field, lo.as_ref(), hi.as_ref(), *lo_inclusive, *hi_inclusive),
            QueryNode::Boost { child, weight } => {
                if !(*weight > 0.0) {
                    return Err(Error::InvalidBoost { weight: *weight });
                }
                let inner = self.node(child)?;
                Ok(Box::new(BoostQuery::new(inner, *weight)))
            }
            QueryNode::FacetFilter { field, .. } => Err(Error::invalid_query(
                field,
                "facet filters must be top-level conjuncts",
            )),
        }
    }

    fn term(&mut self, field: &str, text: &str) -> Result<Box<dyn Query>> {
        let compiled = self.schema.require_field(field)?;
        self.require_indexed(compiled)?;

        let query: Box<dyn Query> = match compiled.spec.kind {
            FieldKind::Text | FieldKind::Ngram => {
                self.highlight_terms.push(text.to_string());
                let tokens = self.analyze(compiled, text)?;
                let term_field = self.term_field(compiled)?;
                match tokens.len() {
                    0 => Box::new(EmptyQuery),
                    1 => Box::new(TermQuery::new(
                        Term::from_field_text(term_field, &tokens[0]),
                        IndexRecordOption::WithFreqs,
                    )),
                    _ => {
                        // Multi-token input: all tokens must occur.
                        let clauses = tokens
                            .iter()
                            .map(|t| {
                                (
                                    Occur::Must,
                                    Box::new(TermQuery::new(
                                        Term::from_field_text(term_field, t),
                                        IndexRecordOption::WithFreqs,
                                    )) as Box<dyn Query>,
                                )
                            })
                            .collect();
                        Box::new(BooleanQuery::new(clauses))
                    }
                }
            }
            FieldKind::Keyword | FieldKind::Location => {
                let term_field = self.term_field(compiled)?;
                Box::new(TermQuery::new(
                    Term::from_field_text(term_field, text),
                    IndexRecordOption::Basic,
                ))
            }
            FieldKind::Facet => {
                let term_field = self.term_field(compiled)?;
                let facet = Facet::from_path(std::iter::once(text));
                Box::new(TermQuery::new(
                    Term::from_facet(term_field, &facet),
                    IndexRecordOption::Basic,
                ))
            }
            FieldKind::Numeric => {
                let value: f64 = text.parse().map_err(|_| {
                    Error::invalid_query(field, format!("'{text}' is not numeric"))
                })?;
                let slot_field = self.slot_field(compiled)?;
                Box::new(TermQuery::new(
                    Term::from_field_u64(slot_field, marshal::encode_f64(value)),
                    IndexRecordOption::Basic,
                ))
            }
            FieldKind::Date => {
                let parsed = chrono::DateTime::parse_from_rfc3339(text).map_err(|_| {
                    Error::invalid_query(field, format!("'{text}' is not an RFC 3339 date"))
                })?;
                let encoded = marshal::encode_date(&parsed.with_timezone(&chrono::Utc))?;
                let slot_field = self.slot_field(compiled)?;
                Box::new(TermQuery::new(
                    Term::from_field_u64(slot_field, encoded),
                    IndexRecordOption::Basic,
                ))
            }
            FieldKind::StoredOnly => {
                return Err(Error::invalid_query(field, "field is not indexed"));
            }
        };

        Ok(self.apply_field_boost(compiled, query))
    }

    fn phrase(&mut self, field: &str, terms: &[String]) -> Result<Box<dyn Query>> {
        let compiled = self.schema.require_field(field)?;
        self.require_indexed(compiled)?;

        if !compiled.spec.kind.supports_phrase() {
            return Err(Error::invalid_query(
                field,
                format!("phrase queries need a text field, not {}", compiled.spec.kind.name()),
            ));
        }

        self.highlight_terms.extend(terms.iter().cloned());

        let term_field = self.term_field(compiled)?;
        let mut engine_terms = Vec::with_capacity(terms.len());
        for text in terms {
            for token in self.analyze(compiled, text)? {
                engine_terms.push(Term::from_field_text(term_field, &token));
            }
        }

        let query: Box<dyn Query> = if engine_terms.is_empty() {
            Box::new(EmptyQuery)
        } else if engine_terms.len() == 1 {
            let term = engine_terms.remove(0);
            Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
        } else {
            Box::new(PhraseQuery::new(engine_terms))
        };

        Ok(self.apply_field_boost(compiled, query))
    }

    fn range(
        &mut self,
        field: &str,
        lo: Option<&FieldValue>,
        hi: Option<&FieldValue>,
        lo_inclusive: bool,
        hi_inclusive: bool,
    ) -> Result<Box<dyn Query>> {
        let compiled = self.schema.require_field(field)?;
        self.require_indexed(compiled)?;

        if !compiled.spec.kind.is_sortable() {
            return Err(Error::invalid_range(
                field,
                format!("{} fields have no value slot", compiled.spec.kind.name()),
            ));
        }

        let slot_field = self.slot_field(compiled)?;
        let lo_encoded = lo
            .map(|v| marshal::slot_value(field, compiled.spec.kind, v))
            .transpose()?;
        let hi_encoded = hi
            .map(|v| marshal::slot_value(field, compiled.spec.kind, v))
            .transpose()?;

        if let (Some(lo), Some(hi)) = (lo_encoded, hi_encoded) {
            if lo > hi {
                return Err(Error::invalid_range(field, "lower bound above upper bound"));
            }
        }

        let lower = match (lo_encoded, lo_inclusive) {
            (None, _) => Bound::Unbounded,
            (Some(v), true) => Bound::Included(Term::from_field_u64(slot_field, v)),
            (Some(v), false) => Bound::Excluded(Term::from_field_u64(slot_field, v)),
        };
        let upper = match (hi_encoded, hi_inclusive) {
            (None, _) => Bound::Unbounded,
            (Some(v), true) => Bound::Included(Term::from_field_u64(slot_field, v)),
            (Some(v), false) => Bound::Excluded(Term::from_field_u64(slot_field, v)),
        };

        Ok(Box::new(RangeQuery::new(lower, upper)))
    }

    fn facet_filter(&mut self, field: &str, value: &str) -> Result<Box<dyn Query>> {
        let compiled = self.schema.require_field(field)?;
        if compiled.spec.kind != FieldKind::Facet {
            return Err(Error::invalid_query(
                field,
                format!("facet filter on a {} field", compiled.spec.kind.name()),
            ));
        }
        let term_field = self.term_field(compiled)?;
        let facet = Facet::from_path(std::iter::once(value));
        Ok(Box::new(TermQuery::new(
            Term::from_facet(term_field, &facet),
            IndexRecordOption::Basic,
        )))
    }

    fn analyze(&self, compiled: &CompiledField, text: &str) -> Result<Vec<String>> {
        let Some(mut analyzer) = self.schema.analyzer_for(compiled)? else {
            return Ok(vec![text.to_string()]);
        };
        let mut tokens = Vec::new();
        let mut stream = analyzer.token_stream(text);
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }
        Ok(tokens)
    }

    fn apply_field_boost(&self, compiled: &CompiledField, query: Box<dyn Query>) -> Box<dyn Query> {
        let weight = compiled.spec.boost_weight;
        if (weight - 1.0).abs() < f32::EPSILON || weight <= 0.0 {
            query
        } else {
            Box::new(BoostQuery::new(query, weight))
        }
    }

    fn require_indexed(&self, compiled: &CompiledField) -> Result<()> {
        if compiled.spec.indexed {
            Ok(())
        } else {
            Err(Error::invalid_query(&compiled.spec.name, "field is not indexed"))
        }
    }

    fn term_field(&self, compiled: &CompiledField) -> Result<tantivy::schema::Field> {
        compiled
            .term_field
            .ok_or_else(|| Error::invalid_query(&compiled.spec.name, "field has no term namespace"))
    }

    fn slot_field(&self, compiled: &CompiledField) -> Result<tantivy::schema::Field> {
        compiled
            .slot_field
            .ok_or_else(|| Error::invalid_query(&compiled.spec.name, "field has no value slot"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldSpec, Schema};

    fn compiled() -> CompiledSchema {
        let schema = Schema::builder()
            .field(FieldSpec::text("title").boost(3.0))
            .field(FieldSpec::text("body"))
            .field(FieldSpec::numeric("price"))
            .field(FieldSpec::date("published"))
            .field(FieldSpec::facet("category"))
            .field(FieldSpec::keyword("sku"))
            .field(FieldSpec::new("summary", FieldKind::StoredOnly).unindexed())
            .build()
            .unwrap();
        CompiledSchema::compile(&schema).unwrap()
    }

    // ------------------------------------------------------------------------
    // Normalization
    // ------------------------------------------------------------------------

    #[test]
    fn test_normalize_flattens_nested_and() {
        let tree = QueryNode::and(vec![
            QueryNode::term("title", "red"),
            QueryNode::and(vec![
                QueryNode::term("body", "fox"),
                QueryNode::term("body", "dog"),
            ]),
        ]);

        match tree.normalize() {
            QueryNode::And { children } => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_flattens_nested_or() {
        let tree = QueryNode::or(vec![
            QueryNode::or(vec![
                QueryNode::term("title", "a"),
                QueryNode::term("title", "b"),
            ]),
            QueryNode::term("title", "c"),
        ]);

        match tree.normalize() {
            QueryNode::Or { children } => assert_eq!(children.len(), 3),
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_collapses_single_child() {
        let tree = QueryNode::and(vec![QueryNode::term("title", "red")]);
        assert_eq!(tree.normalize(), QueryNode::term("title", "red"));
    }

    #[test]
    fn test_normalize_eliminates_double_negation() {
        let tree = QueryNode::not(QueryNode::not(QueryNode::term("title", "red")));
        assert_eq!(tree.normalize(), QueryNode::term("title", "red"));
    }

    #[test]
    fn test_normalize_keeps_empty_sentinels() {
        assert_eq!(
            QueryNode::and(vec![]).normalize(),
            QueryNode::And { children: vec![] }
        );
        assert_eq!(
            QueryNode::or(vec![]).normalize(),
            QueryNode::Or { children: vec![] }
        );
    }

    #[test]
    fn test_normalize_mixed_kinds_not_flattened() {
        let tree = QueryNode::and(vec![
            QueryNode::or(vec![
                QueryNode::term("title", "a"),
                QueryNode::term("title", "b"),
            ]),
            QueryNode::term("title", "c"),
        ]);

        match tree.normalize() {
            QueryNode::And { children } => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], QueryNode::Or { .. }));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------------
    // Translation
    // ------------------------------------------------------------------------

    #[test]
    fn test_translate_term() {
        let schema = compiled();
        let native = translate(&QueryNode::term("title", "red"), &schema).unwrap();
        assert!(!native.has_filters());
        assert_eq!(native.highlight_terms(), &["red".to_string()]);
    }

    #[test]
    fn test_translate_unknown_field() {
        let schema = compiled();
        let err = translate(&QueryNode::term("colour", "red"), &schema).unwrap_err();
        assert!(matches!(err, Error::UnknownField(_)));
    }

    #[test]
    fn test_translate_unindexed_field() {
        let schema = compiled();
        let err = translate(&QueryNode::term("summary", "x"), &schema).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_translate_phrase_on_numeric_fails() {
        let schema = compiled();
        let err = translate(&QueryNode::phrase("price", ["10", "20"]), &schema).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_translate_range_on_text_fails() {
        let schema = compiled();
        let err = translate(
            &QueryNode::range(
                "title",
                Some(FieldValue::Integer(1)),
                None,
                true,
                true,
            ),
            &schema,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn test_translate_inverted_range_fails() {
        let schema = compiled();
        let err = translate(
            &QueryNode::range(
                "price",
                Some(FieldValue::Integer(25)),
                Some(FieldValue::Integer(15)),
                true,
                true,
            ),
            &schema,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn test_translate_equal_range_bounds_ok() {
        let schema = compiled();
        let result = translate(
            &QueryNode::range(
                "price",
                Some(FieldValue::Integer(10)),
                Some(FieldValue::Integer(10)),
                true,
                true,
            ),
            &schema,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_translate_zero_boost_fails() {
        let schema = compiled();
        for weight in [0.0, -2.0, f32::NAN] {
            let err = translate(
                &QueryNode::boost(QueryNode::term("title", "red"), weight),
                &schema,
            )
            .unwrap_err();
            assert!(matches!(err, Error::InvalidBoost { .. }));
        }
    }

    #[test]
    fn test_translate_facet_filter_hoisted() {
        let schema = compiled();
        let native = translate(
            &QueryNode::and(vec![
                QueryNode::term("title", "red"),
                QueryNode::facet("category", "toys"),
            ]),
            &schema,
        )
        .unwrap();
        assert!(native.has_filters());
    }

    #[test]
    fn test_translate_facet_filter_alone() {
        let schema = compiled();
        let native = translate(&QueryNode::facet("category", "toys"), &schema).unwrap();
        assert!(native.has_filters());
    }

    #[test]
    fn test_translate_facet_filter_nested_fails() {
        let schema = compiled();
        let err = translate(
            &QueryNode::or(vec![
                QueryNode::term("title", "red"),
                QueryNode::facet("category", "toys"),
            ]),
            &schema,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_translate_facet_filter_on_text_field_fails() {
        let schema = compiled();
        let err = translate(&QueryNode::facet("title", "toys"), &schema).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_translate_numeric_term_requires_number() {
        let schema = compiled();
        let err = translate(&QueryNode::term("price", "cheap"), &schema).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_translate_date_term_requires_rfc3339() {
        let schema = compiled();
        assert!(translate(
            &QueryNode::term("published", "2024-05-01T00:00:00Z"),
            &schema
        )
        .is_ok());
        assert!(translate(&QueryNode::term("published", "yesterday"), &schema).is_err());
    }

    #[test]
    fn test_translate_empty_sentinels() {
        let schema = compiled();
        assert!(translate(&QueryNode::and(vec![]), &schema).is_ok());
        assert!(translate(&QueryNode::or(vec![]), &schema).is_ok());
    }

    #[test]
    fn test_phrase_collects_highlight_terms() {
        let schema = compiled();
        let native = translate(&QueryNode::phrase("title", ["red", "fox"]), &schema).unwrap();
        assert_eq!(native.highlight_terms().len(), 2);
    }
}
