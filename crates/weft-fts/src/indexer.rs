//! Write sessions: building, replacing, and committing documents.
//!
//! The engine enforces a single-writer discipline. [`WriteSession::open`]
//! acquires the exclusive write lock with a bounded timeout (surfacing
//! [`Error::LockTimeout`] instead of blocking forever), stages documents in
//! a private buffer, and publishes them all-or-nothing on
//! [`WriteSession::commit`]. Readers keep seeing the previous snapshot
//! until the commit republishes the pointer.
//!
//! Indexing a record whose primary key already exists is a replace: the old
//! document's terms and slots are removed and the new ones inserted within
//! the same transaction, so readers never observe zero or two documents for
//! a key.

use std::time::{Duration, Instant};

use tantivy::schema::Facet;
use tantivy::{IndexWriter, TantivyDocument, TantivyError, Term};

use crate::config::{MalformedRecordPolicy, SearchConfig};
use crate::document::Record;
use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldValue};
use crate::handle::IndexHandle;
use crate::marshal;
use crate::schema::CompiledSchema;

/// Stored payload layout version, for forward-compatible reads.
pub const PAYLOAD_VERSION: u32 = 1;

/// Options controlling a write session.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Writer heap size in bytes.
    pub heap_bytes: usize,
    /// How long to wait for the exclusive write lock.
    pub lock_timeout: Duration,
    /// Poll interval while waiting for the lock.
    pub lock_poll: Duration,
    /// Policy for malformed records in [`WriteSession::index_all`].
    pub malformed: MalformedRecordPolicy,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            heap_bytes: 50_000_000,
            lock_timeout: Duration::from_secs(5),
            lock_poll: Duration::from_millis(100),
            malformed: MalformedRecordPolicy::Skip,
        }
    }
}

impl From<&SearchConfig> for WriteOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            heap_bytes: config.writer_heap_bytes,
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            lock_poll: Duration::from_millis(config.lock_poll_ms),
            malformed: config.malformed_records,
        }
    }
}

/// Outcome of a batch ingestion under the skip policy.
#[derive(Debug, Default)]
pub struct BatchStats {
    /// Records staged successfully.
    pub indexed: usize,
    /// Records skipped, with the error each one failed with.
    pub skipped: Vec<(String, Error)>,
}

/// An exclusive write transaction against one index.
pub struct WriteSession<'a> {
    handle: &'a IndexHandle,
    writer: IndexWriter,
    options: WriteOptions,
    staged: usize,
}

impl<'a> WriteSession<'a> {
    /// Acquire the write lock and open a session.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::LockTimeout`] if another session holds the lock
    /// past the configured timeout.
    pub fn open(handle: &'a IndexHandle, options: WriteOptions) -> Result<Self> {
        let start = Instant::now();
        let writer: IndexWriter = loop {
            match handle.index().writer(options.heap_bytes) {
                Ok(writer) => break writer,
                Err(TantivyError::LockFailure(..)) => {
                    let waited = start.elapsed();
                    if waited >= options.lock_timeout {
                        return Err(Error::LockTimeout {
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    std::thread::sleep(options.lock_poll);
                }
                Err(other) => return Err(other.into()),
            }
        };

        Ok(Self {
            handle,
            writer,
            options,
            staged: 0,
        })
    }

    /// Stage one record, replacing any existing document with the same
    /// qualified key.
    ///
    /// Returns the engine operation stamp of the insert.
    pub fn index(&mut self, record: &Record) -> Result<u64> {
        let schema = self.handle.schema();
        let document = build_document(record, schema)?;

        let key_term = Term::from_field_text(schema.key_field(), &record.qualified_key());
        self.writer.delete_term(key_term);
        let opstamp = self.writer.add_document(document)?;
        self.staged += 1;
        Ok(opstamp)
    }

    /// Stage a batch of records under the configured malformed-record
    /// policy.
    ///
    /// With [`MalformedRecordPolicy::Skip`], bad records are collected in
    /// [`BatchStats::skipped`] and the rest of the batch is staged. With
    /// [`MalformedRecordPolicy::Abort`], the first bad record rolls back
    /// everything staged in this session and surfaces its error.
    pub fn index_all(&mut self, records: &[Record]) -> Result<BatchStats> {
        let mut stats = BatchStats::default();

        for record in records {
            match self.index(record) {
                Ok(_) => stats.indexed += 1,
                Err(err) => match self.options.malformed {
                    MalformedRecordPolicy::Skip => {
                        log::warn!("skipping record '{}': {err}", record.qualified_key());
                        stats.skipped.push((record.qualified_key(), err));
                    }
                    MalformedRecordPolicy::Abort => {
                        self.rollback()?;
                        return Err(err);
                    }
                },
            }
        }

        Ok(stats)
    }

    /// Stage removal of one document by key.
    pub fn remove(&mut self, doc_type: &str, key: &str) -> Result<()> {
        let qualified = weft_core::qualified_key(doc_type, key);
        let term = Term::from_field_text(self.handle.schema().key_field(), &qualified);
        self.writer.delete_term(term);
        Ok(())
    }

    /// Stage removal of every document of one type.
    pub fn remove_doc_type(&mut self, doc_type: &str) -> Result<()> {
        let term = Term::from_field_text(self.handle.schema().type_field(), doc_type);
        self.writer.delete_term(term);
        Ok(())
    }

    /// Stage removal of every document in the index.
    pub fn clear_all(&mut self) -> Result<()> {
        self.writer.delete_all_documents()?;
        Ok(())
    }

    /// Number of documents staged since the session opened.
    pub fn staged(&self) -> usize {
        self.staged
    }

    /// Publish everything staged since the last commit.
    ///
    /// All-or-nothing: on failure nothing staged becomes visible and the
    /// prior snapshot remains current. On success the snapshot pointer is
    /// republished and the generation counter advances.
    pub fn commit(&mut self) -> Result<u64> {
        let opstamp = self.writer.commit()?;
        let generation = self.handle.advance_generation()?;
        log::debug!(
            "committed {} staged docs, generation {generation}",
            self.staged
        );
        self.staged = 0;
        Ok(opstamp)
    }

    /// Discard everything staged since the last commit.
    pub fn rollback(&mut self) -> Result<u64> {
        let opstamp = self.writer.rollback()?;
        self.staged = 0;
        Ok(opstamp)
    }
}

impl std::fmt::Debug for WriteSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteSession")
            .field("staged", &self.staged)
            .field("malformed", &self.options.malformed)
            .finish()
    }
}

/// Build the engine document for one record.
///
/// Iterates the schema (not the record), so record fields absent from the
/// schema are ignored, mirroring how unknown keys in loosely-typed source
/// records are treated upstream. Field values are validated against their
/// declarations; failures carry the record key and field name.
fn build_document(record: &Record, schema: &CompiledSchema) -> Result<TantivyDocument> {
    let mut document = TantivyDocument::new();
    let qualified = record.qualified_key();

    document.add_text(schema.key_field(), &qualified);
    document.add_text(schema.type_field(), &record.doc_type);

    let mut stored = serde_json::Map::new();

    for spec in schema.source().fields() {
        let Some(value) = record.field(&spec.name) else {
            continue;
        };

        value.validate_for(spec).map_err(|e| {
            Error::index_write(&qualified, Some(spec.name.as_str()), e.to_string())
        })?;

        let compiled = match schema.field(&spec.name) {
            Some(c) => c,
            None => continue,
        };

        if spec.indexed {
            for scalar in value.scalars() {
                add_indexed_value(&mut document, compiled, scalar, &qualified)?;
            }
        }

        if spec.stored {
            stored.insert(spec.name.clone(), serde_json::to_value(value)?);
        }
    }

    let payload = serde_json::to_string(&serde_json::json!({
        "version": PAYLOAD_VERSION,
        "key": record.key,
        "doc_type": record.doc_type,
        "fields": serde_json::Value::Object(stored),
    }))?;
    document.add_text(schema.payload_field(), &payload);

    Ok(document)
}

fn add_indexed_value(
    document: &mut TantivyDocument,
    compiled: &crate::schema::CompiledField,
    scalar: &FieldValue,
    record_key: &str,
) -> Result<()> {
    let name = &compiled.spec.name;
    match compiled.spec.kind {
        FieldKind::Text | FieldKind::Ngram | FieldKind::Keyword | FieldKind::Location => {
            let Some(field) = compiled.term_field else {
                return Ok(());
            };
            let Some(text) = scalar.term_text() else {
                return Err(Error::index_write(
                    record_key,
                    Some(name.as_str()),
                    format!("{} value has no term form", scalar.variant_name()),
                ));
            };
            document.add_text(field, &text);
        }
        FieldKind::Facet => {
            let Some(field) = compiled.term_field else {
                return Ok(());
            };
            let Some(text) = scalar.term_text() else {
                return Err(Error::index_write(
                    record_key,
                    Some(name.as_str()),
                    format!("{} value has no facet form", scalar.variant_name()),
                ));
            };
            document.add_facet(field, Facet::from_path(std::iter::once(text)));
        }
        FieldKind::Numeric | FieldKind::Date => {
            let Some(field) = compiled.slot_field else {
                return Ok(());
            };
            let encoded = marshal::slot_value(name, compiled.spec.kind, scalar)
                .map_err(|e| Error::index_write(record_key, Some(name.as_str()), e.to_string()))?;
            document.add_u64(field, encoded);
        }
        FieldKind::StoredOnly => {}
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
