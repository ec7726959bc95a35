//! Spelling suggestions from the engine's term dictionary.
//!
//! When a query comes back empty, the executor can ask for the nearest
//! in-vocabulary term per query term. The vocabulary is the index's own
//! term dictionary, so suggestions always point at terms that actually
//! match something; candidates are ranked by edit distance first and
//! document frequency second.
//!
//! The dictionary stores analyzed (stemmed) forms, so a suggestion is the
//! stemmed neighbor of the typo, which is what gets fed back into a retry.

use tantivy::schema::Field;
use tantivy::Searcher;
use weft_core::Error as CoreError;

use crate::error::{Error, Result};

/// Maximum edit distance a suggestion may be from the input.
const MAX_DISTANCE: usize = 2;

/// Suggest a corrected form for each term, returning the corrected query
/// string, or `None` when every term is already in vocabulary (or nothing
/// better exists).
pub fn suggest_phrase(
    searcher: &Searcher,
    fields: &[Field],
    terms: &[String],
) -> Result<Option<String>> {
    let mut corrected = Vec::with_capacity(terms.len());
    let mut changed = false;

    for term in terms {
        let normalized = term.to_lowercase();
        match nearest_term(searcher, fields, &normalized)? {
            Some(better) if better != normalized => {
                corrected.push(better);
                changed = true;
            }
            _ => corrected.push(normalized),
        }
    }

    Ok(changed.then(|| corrected.join(" ")))
}

/// Find the nearest in-vocabulary term for `input` across the given
/// fields' term dictionaries.
///
/// Returns `Some(input)` unchanged when the input itself is in vocabulary.
pub fn nearest_term(
    searcher: &Searcher,
    fields: &[Field],
    input: &str,
) -> Result<Option<String>> {
    let mut best: Option<(usize, u64, String)> = None;

    for segment in searcher.segment_readers() {
        for &field in fields {
            let inverted = segment.inverted_index(field)?;
            let dictionary = inverted.terms();
            let mut stream = dictionary
                .stream()
                .map_err(|e| Error::Core(CoreError::io(e)))?;

            while stream.advance() {
                let Ok(candidate) = std::str::from_utf8(stream.key()) else {
                    continue;
                };

                // Cheap length gate before computing the distance.
                if candidate.len().abs_diff(input.len()) > MAX_DISTANCE {
                    continue;
                }

                if candidate == input {
                    return Ok(Some(input.to_string()));
                }

                let distance = strsim::levenshtein(input, candidate);
                if distance > MAX_DISTANCE {
                    continue;
                }

                let doc_freq = stream.value().doc_freq as u64;
                let replace = match &best {
                    None => true,
                    Some((best_distance, best_freq, _)) => {
                        distance < *best_distance
                            || (distance == *best_distance && doc_freq > *best_freq)
                    }
                };
                if replace {
                    best = Some((distance, doc_freq, candidate.to_string()));
                }
            }
        }
    }

    Ok(best.map(|(_, _, term)| term))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Record;
    use crate::field::{FieldSpec, Schema};
    use crate::handle::IndexHandle;
    use crate::indexer::{WriteOptions, WriteSession};
    use crate::schema::CompiledSchema;

    fn indexed_handle() -> IndexHandle {
        let schema = Schema::builder()
            .field(FieldSpec::text("title"))
            .build()
            .unwrap();
        let compiled = CompiledSchema::compile(&schema).unwrap();
        let handle = IndexHandle::create_in_ram(compiled).unwrap();

        let mut session = WriteSession::open(&handle, WriteOptions::default()).unwrap();
        for (key, title) in [("1", "red fox"), ("2", "red dog"), ("3", "red fox den")] {
            session
                .index(&Record::builder("product", key).text("title", title).build())
                .unwrap();
        }
        session.commit().unwrap();
        handle
    }

    fn title_field(handle: &IndexHandle) -> Field {
        handle
            .schema()
            .field("title")
            .unwrap()
            .term_field
            .unwrap()
    }

    #[test]
    fn test_nearest_term_corrects_typo() {
        let handle = indexed_handle();
        let snapshot = handle.snapshot().unwrap();
        let fields = [title_field(&handle)];

        let suggestion = nearest_term(snapshot.searcher(), &fields, "fxo").unwrap();
        assert_eq!(suggestion.as_deref(), Some("fox"));
    }

    #[test]
    fn test_nearest_term_prefers_frequent_terms() {
        let handle = indexed_handle();
        let snapshot = handle.snapshot().unwrap();
        let fields = [title_field(&handle)];

        // "rad" is distance 1 from both "red" (3 docs) and nothing else
        // closer; frequency breaks any tie.
        let suggestion = nearest_term(snapshot.searcher(), &fields, "rad").unwrap();
        assert_eq!(suggestion.as_deref(), Some("red"));
    }

    #[test]
    fn test_nearest_term_in_vocabulary_is_identity() {
        let handle = indexed_handle();
        let snapshot = handle.snapshot().unwrap();
        let fields = [title_field(&handle)];

        let suggestion = nearest_term(snapshot.searcher(), &fields, "fox").unwrap();
        assert_eq!(suggestion.as_deref(), Some("fox"));
    }

    #[test]
    fn test_nearest_term_none_for_distant_input() {
        let handle = indexed_handle();
        let snapshot = handle.snapshot().unwrap();
        let fields = [title_field(&handle)];

        let suggestion = nearest_term(snapshot.searcher(), &fields, "zygomorphic").unwrap();
        assert!(suggestion.is_none());
    }

    #[test]
    fn test_suggest_phrase_reports_only_changes() {
        let handle = indexed_handle();
        let snapshot = handle.snapshot().unwrap();
        let fields = [title_field(&handle)];

        let unchanged =
            suggest_phrase(snapshot.searcher(), &fields, &["red".to_string()]).unwrap();
        assert!(unchanged.is_none());

        let corrected = suggest_phrase(
            snapshot.searcher(),
            &fields,
            &["red".to_string(), "fxo".to_string()],
        )
        .unwrap();
        assert_eq!(corrected.as_deref(), Some("red fox"));
    }
}
