//! Rendering matches back into framework-facing records.
//!
//! [`ResultMapper::render`] turns a [`MatchPage`] into a lazy, finite,
//! restartable sequence of [`ResultRecord`]s: each step fetches one
//! matched document's stored payload from the pinned snapshot and
//! deserializes it back into field-name → value pairs. Re-rendering the
//! same page yields the same records — the page is immutable and the
//! snapshot it was computed against never changes.
//!
//! Highlighting re-locates the original query terms inside the original
//! stored text (not the stemmed index form), wraps them in `<em>` tags,
//! and windows a snippet around the first occurrence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use weft_core::Error as CoreError;

use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldValue};
use crate::handle::IndexSnapshot;
use crate::schema::CompiledSchema;
use crate::search::{MatchHit, MatchPage};

/// Default highlighted snippet length in characters.
const DEFAULT_SNIPPET_LENGTH: usize = 200;

/// One rendered search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Primary key of the source record.
    pub primary_key: String,
    /// Document type discriminator.
    pub doc_type: String,
    /// Relevance score carried over from the match.
    pub score: f32,
    /// Stored field values, keyed by field name.
    pub fields: BTreeMap<String, FieldValue>,
    /// Highlighted snippet, when highlighting was requested and a query
    /// term occurs in a stored text field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_snippet: Option<String>,
}

/// The stored payload layout written by the indexer.
#[derive(Debug, Deserialize)]
struct StoredPayload {
    #[serde(default)]
    #[allow(dead_code)]
    version: u32,
    key: String,
    doc_type: String,
    fields: BTreeMap<String, FieldValue>,
}

/// Converts native matches back into result records.
///
/// Immutable; safe to share across threads and reuse across pages.
#[derive(Debug, Clone, Copy)]
pub struct ResultMapper<'a> {
    schema: &'a CompiledSchema,
    snippet_length: usize,
}

impl<'a> ResultMapper<'a> {
    /// Create a mapper over a compiled schema.
    pub fn new(schema: &'a CompiledSchema) -> Self {
        Self {
            schema,
            snippet_length: DEFAULT_SNIPPET_LENGTH,
        }
    }

    /// Override the snippet length.
    pub fn with_snippet_length(mut self, snippet_length: usize) -> Self {
        self.snippet_length = snippet_length.max(8);
        self
    }

    /// Render a page lazily against the snapshot it was computed from.
    ///
    /// The iterator is restartable: calling `render` again re-renders from
    /// the same immutable page.
    pub fn render<'s>(
        &self,
        snapshot: &'s IndexSnapshot,
        page: &'s MatchPage,
    ) -> RenderedResults<'a, 's> {
        RenderedResults {
            schema: self.schema,
            snippet_length: self.snippet_length,
            snapshot,
            page,
            cursor: 0,
        }
    }
}

/// Lazy iterator over rendered records.
pub struct RenderedResults<'a, 's> {
    schema: &'a CompiledSchema,
    snippet_length: usize,
    snapshot: &'s IndexSnapshot,
    page: &'s MatchPage,
    cursor: usize,
}

impl RenderedResults<'_, '_> {
    fn render_one(&self, hit: &MatchHit) -> Result<ResultRecord> {
        let document: TantivyDocument = self.snapshot.searcher().doc(hit.address)?;

        let payload_text = document
            .get_first(self.schema.payload_field())
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                Error::Core(CoreError::parse("matched document has no stored payload"))
            })?;
        let payload: StoredPayload = serde_json::from_str(payload_text)?;

        let highlighted_snippet = if self.page.highlight {
            self.snippet_for(&payload)
        } else {
            None
        };

        Ok(ResultRecord {
            primary_key: payload.key,
            doc_type: payload.doc_type,
            score: hit.score,
            fields: payload.fields,
            highlighted_snippet,
        })
    }

    /// Highlight the first stored text field containing a query term.
    fn snippet_for(&self, payload: &StoredPayload) -> Option<String> {
        let terms = self.page.highlight_terms();
        if terms.is_empty() {
            return None;
        }

        for spec in self.schema.source().fields() {
            if spec.kind != FieldKind::Text || !spec.stored {
                continue;
            }
            let Some(value) = payload.fields.get(&spec.name) else {
                continue;
            };
            for scalar in value.scalars() {
                if let FieldValue::Text(text) = scalar {
                    if let Some(snippet) = highlight_snippet(text, terms, self.snippet_length) {
                        return Some(snippet);
                    }
                }
            }
        }
        None
    }
}

impl Iterator for RenderedResults<'_, '_> {
    type Item = Result<ResultRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let hit = self.page.hits.get(self.cursor)?;
        self.cursor += 1;
        Some(self.render_one(hit))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.page.hits.len().saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}

/// Window a snippet around the first term occurrence and wrap every
/// occurrence of each term in `<em>` tags.
///
/// Matching is case-insensitive against the original text. Returns `None`
/// when no term occurs.
fn highlight_snippet(text: &str, terms: &[String], max_length: usize) -> Option<String> {
    let lower = text.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII; positions would
    // no longer line up, so fall back to exact matching there.
    let lower = if lower.len() == text.len() {
        lower
    } else {
        text.to_string()
    };

    let mut first_match: Option<usize> = None;
    for term in terms {
        let needle = term.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if let Some(pos) = lower.find(&needle) {
            first_match = Some(first_match.map_or(pos, |p| p.min(pos)));
        }
    }
    let pos = first_match?;

    // Window around the match, snapped to word boundaries.
    let context = max_length / 4;
    let mut start = pos.saturating_sub(context);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    if start > 0 {
        start = text[..start]
            .rfind(char::is_whitespace)
            .map(|p| p + 1)
            .unwrap_or(start);
    }

    let mut end = (start + max_length).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if end < text.len() {
        end = text[end..]
            .find(char::is_whitespace)
            .map(|p| end + p)
            .unwrap_or(end);
    }

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(text[start..end].trim());
    if end < text.len() {
        snippet.push_str("...");
    }

    for term in terms {
        snippet = emphasize(&snippet, term);
    }

    Some(snippet)
}

/// Wrap every case-insensitive occurrence of `term` in `<em>` tags.
fn emphasize(text: &str, term: &str) -> String {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return text.to_string();
    }
    let haystack = text.to_lowercase();
    if haystack.len() != text.len() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut at = 0;
    while let Some(rel) = haystack[at..].find(&needle) {
        let abs = at + rel;
        out.push_str(&text[at..abs]);
        out.push_str("<em>");
        out.push_str(&text[abs..abs + needle.len()]);
        out.push_str("</em>");
        at = abs + needle.len();
    }
    out.push_str(&text[at..]);
    out
}

// ============================================================================
// Tests
// ============================================================================
