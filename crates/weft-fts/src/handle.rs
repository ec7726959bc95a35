//! Index handle and snapshots.
//!
//! The underlying engine exposes one database per directory; [`IndexHandle`]
//! models that as an explicit resource passed by reference to the indexer
//! and the executor, instead of ambient process-global state. The handle
//! owns the engine index, a manually-reloaded reader, and a generation
//! counter that readers use to detect staleness.
//!
//! Reads never touch in-progress writes: [`IndexHandle::snapshot`] pins the
//! last committed state, and an in-flight search keeps its snapshot alive
//! even while later commits republish the pointer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tantivy::{Index, IndexReader, ReloadPolicy, Searcher};
use weft_core::Error as CoreError;

use crate::error::{Error, Result};
use crate::schema::{CompiledSchema, SchemaFingerprint};

/// An immutable, versioned view of committed index state.
///
/// Everything a search touches — postings, value slots, stored payloads —
/// is read through the pinned searcher, so concurrent commits never tear a
/// running query.
#[derive(Clone)]
pub struct IndexSnapshot {
    searcher: Searcher,
    generation: u64,
}

impl IndexSnapshot {
    /// The pinned engine searcher.
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    /// Commit generation this snapshot was taken at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of documents visible in this snapshot.
    pub fn doc_count(&self) -> u64 {
        self.searcher.num_docs()
    }
}

impl std::fmt::Debug for IndexSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSnapshot")
            .field("generation", &self.generation)
            .field("docs", &self.searcher.num_docs())
            .finish()
    }
}

/// Shared handle to one engine index.
pub struct IndexHandle {
    index: Index,
    reader: IndexReader,
    compiled: CompiledSchema,
    generation: AtomicU64,
    path: Option<PathBuf>,
}

impl IndexHandle {
    /// Open the index at `path`, creating it if absent.
    ///
    /// On open, the persisted schema fingerprint is checked against the
    /// compiled schema: a field whose kind changed fails with
    /// [`Error::Schema`] before any term becomes ambiguous. The fingerprint
    /// is (re)written on success.
    pub fn open_or_create(path: &Path, compiled: CompiledSchema) -> Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(path)
                .map_err(|e| Error::Core(CoreError::io_with_path(e, path)))?;
        }

        let existing = path.join("meta.json").exists();
        let index = if existing {
            if let Some(persisted) = SchemaFingerprint::load(path)? {
                compiled.fingerprint().verify_against(&persisted)?;
            }
            let index = Index::open_in_dir(path)?;
            if index.schema() != *compiled.engine_schema() {
                return Err(Error::schema(
                    "<schema>",
                    "declared fields no longer match the existing index; rebuild required",
                ));
            }
            index
        } else {
            Index::create_in_dir(path, compiled.engine_schema().clone())?
        };

        compiled.fingerprint().save(path)?;
        let handle = Self::wrap(index, compiled, Some(path.to_path_buf()))?;
        log::info!(
            "opened index at {} ({} docs)",
            path.display(),
            handle.snapshot()?.doc_count()
        );
        Ok(handle)
    }

    /// Create an in-memory index (for tests and ephemeral use).
    pub fn create_in_ram(compiled: CompiledSchema) -> Result<Self> {
        let index = Index::create_in_ram(compiled.engine_schema().clone());
        Self::wrap(index, compiled, None)
    }

    fn wrap(index: Index, compiled: CompiledSchema, path: Option<PathBuf>) -> Result<Self> {
        compiled.register_tokenizers(&index)?;

        // Manual reload: the snapshot pointer moves only when a commit
        // republishes it through `advance_generation`.
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            compiled,
            generation: AtomicU64::new(0),
            path,
        })
    }

    /// The underlying engine index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// The compiled schema bound to this index.
    pub fn schema(&self) -> &CompiledSchema {
        &self.compiled
    }

    /// Directory backing this index, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current commit generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Pin the latest committed state for reading.
    pub fn snapshot(&self) -> Result<IndexSnapshot> {
        Ok(IndexSnapshot {
            searcher: self.reader.searcher(),
            generation: self.generation(),
        })
    }

    /// Republish the snapshot pointer after a commit.
    ///
    /// Called by the write session on successful commit; not part of the
    /// public read API.
    pub(crate) fn advance_generation(&self) -> Result<u64> {
        self.reader.reload()?;
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(next)
    }
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("path", &self.path)
            .field("generation", &self.generation())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
